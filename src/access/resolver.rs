//! AccessStateResolver: reads the two flags the guards route on.

use std::sync::Arc;

use futures::future::try_join;
use tracing::{debug, warn};

use super::state::AccessState;
use crate::auth::Identity;
use crate::error::AccessError;
use crate::store::ProfileStore;

/// Computes an [`AccessState`] for an authenticated user.
///
/// Every call goes to the store; nothing is cached between calls.
#[derive(Clone)]
pub struct AccessStateResolver {
    store: Arc<dyn ProfileStore>,
}

impl AccessStateResolver {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Resolve the access state for `identity`.
    ///
    /// The scan and onboarding reads run concurrently. If either fails the
    /// whole resolution fails with `StateUnavailable`; flags are never
    /// defaulted.
    pub async fn resolve(&self, identity: &Identity) -> Result<AccessState, AccessError> {
        let user_id = identity.user_id.as_str();

        let reads = try_join(
            self.store.has_any_scan(user_id),
            self.store.get_onboarding_completed(user_id),
        )
        .await;

        match reads {
            Ok((has_paid, onboarding_completed)) => {
                let state = AccessState {
                    onboarding_completed,
                    has_paid,
                };
                debug!(user_id, onboarding_completed, has_paid, "Access state resolved");
                Ok(state)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Access state unavailable");
                Err(AccessError::StateUnavailable {
                    user_id: user_id.to_string(),
                    source: e,
                })
            }
        }
    }
}
