//! RouteGuard: one parameterized state machine behind all three guards.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::navigator::Navigator;
use super::phase::{GuardMount, GuardPhase};
use super::policy::GuardPolicy;
use crate::access::{AccessStateResolver, Destination};
use crate::auth::IdentityProvider;

/// A route guard bound to its collaborators.
pub struct RouteGuard {
    policy: GuardPolicy,
    identity: Arc<dyn IdentityProvider>,
    resolver: AccessStateResolver,
    navigator: Arc<dyn Navigator>,
}

impl RouteGuard {
    pub fn new(
        policy: GuardPolicy,
        identity: Arc<dyn IdentityProvider>,
        resolver: AccessStateResolver,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            policy,
            identity,
            resolver,
            navigator,
        }
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Run one navigation check against `mount`.
    ///
    /// Returns `None` when the mount was torn down before the check settled,
    /// or when it already redirected; in both cases neither the phase nor the
    /// location changes. Returns `Some(Pending)` when the session could not
    /// be resolved.
    pub async fn check(&self, mount: &GuardMount) -> Option<GuardPhase> {
        let guard = self.policy.kind;
        if !mount.is_mounted() {
            return None;
        }
        if !mount.begin() {
            debug!(%guard, phase = %mount.phase(), "Guard already redirected, skipping check");
            return None;
        }

        let identity = match self.identity.current_session().await {
            Ok(identity) => identity,
            Err(e) => {
                warn!(%guard, error = %e, "Session lookup unresolved, staying pending");
                return mount.is_mounted().then_some(GuardPhase::Pending);
            }
        };

        let next = match identity {
            None => match self.policy.redirect_for_guest() {
                None => GuardPhase::Allowed,
                Some(target) => GuardPhase::Redirecting { target },
            },
            Some(identity) => {
                if !mount.is_mounted() {
                    debug!(%guard, "Guard unmounted before access resolution");
                    return None;
                }
                match self.resolver.resolve(&identity).await {
                    Ok(state) => match self.policy.redirect_for(state) {
                        None => GuardPhase::Allowed,
                        Some(target) => GuardPhase::Redirecting { target },
                    },
                    Err(e) => {
                        let fallback = self.policy.redirect_on_unavailable();
                        warn!(
                            %guard,
                            user_id = %identity,
                            error = %e,
                            fallback = ?fallback,
                            "Access state unavailable, applying guard fallback"
                        );
                        match fallback {
                            None => GuardPhase::Allowed,
                            Some(target) => GuardPhase::Redirecting { target },
                        }
                    }
                }
            }
        };

        self.settle(mount, next)
    }

    /// Re-check on every session change until the guard redirects or is
    /// torn down.
    pub async fn follow(&self, mount: &GuardMount) {
        let mut session = self.identity.subscribe();
        session.borrow_and_update();

        loop {
            match self.check(mount).await {
                None | Some(GuardPhase::Redirecting { .. }) => return,
                Some(_) => {}
            }

            tokio::select! {
                changed = session.changed() => {
                    if changed.is_err() {
                        debug!(guard = %self.policy.kind, "Session source closed");
                        return;
                    }
                    let event = session.borrow_and_update().event;
                    debug!(guard = %self.policy.kind, ?event, "Session changed, re-checking");
                }
                _ = mount.unmounted() => return,
            }
        }
    }

    fn settle(&self, mount: &GuardMount, next: GuardPhase) -> Option<GuardPhase> {
        let guard = self.policy.kind;
        if !mount.advance(next) {
            debug!(%guard, phase = %next, "Discarding guard result");
            return None;
        }

        match next.redirect_target() {
            Some(target) => {
                if !self.navigate(mount, target) {
                    return None;
                }
            }
            None => debug!(%guard, "Guard allowed"),
        }
        Some(next)
    }

    /// Replace the location, unless the mount went away after settling.
    fn navigate(&self, mount: &GuardMount, target: Destination) -> bool {
        let guard = self.policy.kind;
        if !mount.is_mounted() {
            debug!(%guard, %target, "Guard unmounted before navigation");
            return false;
        }
        info!(%guard, %target, "Guard redirecting");
        self.navigator.replace(target);
        true
    }
}
