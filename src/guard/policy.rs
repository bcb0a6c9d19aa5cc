//! Guard policies: what each route guard does with a resolved access state.

use serde::{Deserialize, Serialize};

use crate::access::{AccessState, Destination, get_redirect_path};

/// How a guard recovers when the access state cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailablePolicy {
    /// Let the user through so they are never stuck.
    FailOpen,
    /// Send the user to a less privileged destination.
    FailClosed(Destination),
}

/// How a guard maps an access state to a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// Use the shared redirect table.
    SharedTable,
    /// Onboarding's own rule: stay while onboarding is unfinished, otherwise
    /// go to the dashboard when paid and the paywall when not.
    OnboardingFirst,
}

/// Which built-in guard a policy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Onboarding,
    Paywall,
    Dashboard,
}

impl GuardKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "onboarding" => Some(Self::Onboarding),
            "paywall" => Some(Self::Paywall),
            "dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }

    pub fn policy(&self) -> GuardPolicy {
        match self {
            Self::Onboarding => GuardPolicy::onboarding(),
            Self::Paywall => GuardPolicy::paywall(),
            Self::Dashboard => GuardPolicy::dashboard(),
        }
    }
}

impl std::fmt::Display for GuardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Onboarding => "onboarding",
            Self::Paywall => "paywall",
            Self::Dashboard => "dashboard",
        };
        write!(f, "{s}")
    }
}

/// Parameters of one route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    pub kind: GuardKind,
    /// The guarded destination; resolving to it means "stay".
    pub path: Destination,
    /// Whether visitors without a session are let through.
    pub allow_guests: bool,
    pub on_unavailable: UnavailablePolicy,
    pub routing: Routing,
}

impl GuardPolicy {
    pub fn onboarding() -> Self {
        Self {
            kind: GuardKind::Onboarding,
            path: Destination::Onboarding,
            allow_guests: true,
            on_unavailable: UnavailablePolicy::FailOpen,
            routing: Routing::OnboardingFirst,
        }
    }

    pub fn paywall() -> Self {
        Self {
            kind: GuardKind::Paywall,
            path: Destination::Paywall,
            allow_guests: true,
            on_unavailable: UnavailablePolicy::FailOpen,
            routing: Routing::SharedTable,
        }
    }

    /// The dashboard fails closed toward onboarding when state is unreadable.
    pub fn dashboard() -> Self {
        Self {
            kind: GuardKind::Dashboard,
            path: Destination::Dashboard,
            allow_guests: false,
            on_unavailable: UnavailablePolicy::FailClosed(Destination::Onboarding),
            routing: Routing::SharedTable,
        }
    }

    /// Where an authenticated user with `state` belongs, per this guard.
    pub fn route(&self, state: AccessState) -> Destination {
        match self.routing {
            Routing::SharedTable => get_redirect_path(state),
            Routing::OnboardingFirst => {
                if !state.onboarding_completed {
                    self.path
                } else if state.has_paid {
                    Destination::Dashboard
                } else {
                    Destination::Paywall
                }
            }
        }
    }

    /// Redirect target for `state`, or `None` when the user may stay.
    pub fn redirect_for(&self, state: AccessState) -> Option<Destination> {
        let target = self.route(state);
        (target != self.path).then_some(target)
    }

    /// Redirect target for a visitor without a session.
    pub fn redirect_for_guest(&self) -> Option<Destination> {
        (!self.allow_guests).then_some(Destination::Home)
    }

    /// Redirect target when the access state is unavailable.
    pub fn redirect_on_unavailable(&self) -> Option<Destination> {
        match self.on_unavailable {
            UnavailablePolicy::FailOpen => None,
            UnavailablePolicy::FailClosed(target) => Some(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> [AccessState; 4] {
        [
            AccessState::new(false, false),
            AccessState::new(false, true),
            AccessState::new(true, false),
            AccessState::new(true, true),
        ]
    }

    #[test]
    fn onboarding_rule_agrees_with_shared_table() {
        let policy = GuardPolicy::onboarding();
        for state in all_states() {
            assert_eq!(policy.route(state), get_redirect_path(state), "{state:?}");
        }
    }

    #[test]
    fn onboarding_guard_redirects() {
        let policy = GuardPolicy::onboarding();
        assert_eq!(policy.redirect_for(AccessState::new(false, false)), None);
        assert_eq!(policy.redirect_for(AccessState::new(false, true)), None);
        assert_eq!(
            policy.redirect_for(AccessState::new(true, false)),
            Some(Destination::Paywall)
        );
        assert_eq!(
            policy.redirect_for(AccessState::new(true, true)),
            Some(Destination::Dashboard)
        );
    }

    #[test]
    fn paywall_guard_redirects() {
        let policy = GuardPolicy::paywall();
        assert_eq!(
            policy.redirect_for(AccessState::new(false, false)),
            Some(Destination::Onboarding)
        );
        assert_eq!(
            policy.redirect_for(AccessState::new(false, true)),
            Some(Destination::Onboarding)
        );
        assert_eq!(policy.redirect_for(AccessState::new(true, false)), None);
        assert_eq!(
            policy.redirect_for(AccessState::new(true, true)),
            Some(Destination::Dashboard)
        );
    }

    #[test]
    fn dashboard_guard_redirects() {
        let policy = GuardPolicy::dashboard();
        assert_eq!(
            policy.redirect_for(AccessState::new(false, false)),
            Some(Destination::Onboarding)
        );
        assert_eq!(
            policy.redirect_for(AccessState::new(false, true)),
            Some(Destination::Onboarding)
        );
        assert_eq!(
            policy.redirect_for(AccessState::new(true, false)),
            Some(Destination::Paywall)
        );
        assert_eq!(policy.redirect_for(AccessState::new(true, true)), None);
    }

    #[test]
    fn guest_handling() {
        assert_eq!(GuardPolicy::onboarding().redirect_for_guest(), None);
        assert_eq!(GuardPolicy::paywall().redirect_for_guest(), None);
        assert_eq!(
            GuardPolicy::dashboard().redirect_for_guest(),
            Some(Destination::Home)
        );
    }

    #[test]
    fn unavailable_handling() {
        assert_eq!(GuardPolicy::onboarding().redirect_on_unavailable(), None);
        assert_eq!(GuardPolicy::paywall().redirect_on_unavailable(), None);
        assert_eq!(
            GuardPolicy::dashboard().redirect_on_unavailable(),
            Some(Destination::Onboarding)
        );
    }

    #[test]
    fn kind_parse_and_display() {
        for kind in [GuardKind::Onboarding, GuardKind::Paywall, GuardKind::Dashboard] {
            assert_eq!(GuardKind::parse(&kind.to_string()), Some(kind));
            assert_eq!(kind.policy().kind, kind);
        }
        assert_eq!(GuardKind::parse("settings"), None);
    }
}
