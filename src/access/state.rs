//! Access state and the redirect table.

use serde::{Deserialize, Serialize};

/// A navigable destination in the app.
///
/// Serialized as its route path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    #[serde(rename = "/")]
    Home,
    #[serde(rename = "/onboarding")]
    Onboarding,
    #[serde(rename = "/paywall")]
    Paywall,
    #[serde(rename = "/dashboard")]
    Dashboard,
}

impl Destination {
    /// The route path for this destination.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Onboarding => "/onboarding",
            Self::Paywall => "/paywall",
            Self::Dashboard => "/dashboard",
        }
    }

    /// Look up a destination by its route path.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" => Some(Self::Home),
            "/onboarding" => Some(Self::Onboarding),
            "/paywall" => Some(Self::Paywall),
            "/dashboard" => Some(Self::Dashboard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// What the user has done so far, as seen by the route guards.
///
/// Derived from the profile and scan records on every check; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessState {
    /// The onboarding questionnaire was submitted.
    pub onboarding_completed: bool,
    /// At least one completed scan exists (stands in for payment).
    pub has_paid: bool,
}

impl AccessState {
    pub fn new(onboarding_completed: bool, has_paid: bool) -> Self {
        Self {
            onboarding_completed,
            has_paid,
        }
    }
}

/// Map an access state to where the user belongs.
///
/// Unfinished onboarding wins over payment: a user who paid but never
/// finished the questionnaire still lands on onboarding.
pub fn get_redirect_path(state: AccessState) -> Destination {
    match (state.onboarding_completed, state.has_paid) {
        (false, _) => Destination::Onboarding,
        (true, false) => Destination::Paywall,
        (true, true) => Destination::Dashboard,
    }
}
