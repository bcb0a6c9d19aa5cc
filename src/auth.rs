//! Identity provider: who is signed in, and notifications when that changes.
//!
//! The guards only read the "is there a user, and what is their id"
//! projection of a session. Change notifications are delivered through a
//! `watch` channel: subscribing hands back the current snapshot, and
//! dropping the receiver unsubscribes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::AuthError;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.user_id)
    }
}

/// What caused the latest session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// Initial value before any change was observed.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub event: SessionEvent,
    pub identity: Option<Identity>,
}

/// Source of the current session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up the current session.
    ///
    /// `Ok(None)` means the lookup settled with no signed-in user.
    async fn current_session(&self) -> Result<Option<Identity>, AuthError>;

    /// Subscribe to session changes. Drop the receiver to unsubscribe.
    fn subscribe(&self) -> watch::Receiver<SessionSnapshot>;
}

/// In-process identity provider driven by explicit sign-in/sign-out calls.
pub struct SessionHub {
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionHub {
    pub fn new(identity: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot {
            event: SessionEvent::InitialSession,
            identity,
        });
        Self { tx }
    }

    pub fn sign_in(&self, identity: Identity) {
        info!(user_id = %identity, "Signed in");
        self.publish(SessionEvent::SignedIn, Some(identity));
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        self.publish(SessionEvent::SignedOut, None);
    }

    /// Re-publish the current identity after a token refresh.
    pub fn refresh_token(&self) {
        let identity = self.tx.borrow().identity.clone();
        debug!(signed_in = identity.is_some(), "Token refreshed");
        self.publish(SessionEvent::TokenRefreshed, identity);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, event: SessionEvent, identity: Option<Identity>) {
        // send_replace stores the value even when nobody is subscribed.
        self.tx.send_replace(SessionSnapshot { event, identity });
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl IdentityProvider for SessionHub {
    async fn current_session(&self) -> Result<Option<Identity>, AuthError> {
        Ok(self.tx.borrow().identity.clone())
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }
}

/// A provider with a fixed answer, e.g. an identity taken from a request.
pub struct StaticIdentity {
    tx: watch::Sender<SessionSnapshot>,
}

impl StaticIdentity {
    pub fn new(identity: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot {
            event: SessionEvent::InitialSession,
            identity,
        });
        Self { tx }
    }

    pub fn guest() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_session(&self) -> Result<Option<Identity>, AuthError> {
        Ok(self.tx.borrow().identity.clone())
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hub_starts_with_initial_identity() {
        let hub = SessionHub::new(Some(Identity::new("u1")));
        let current = hub.current_session().await.unwrap();
        assert_eq!(current, Some(Identity::new("u1")));

        let rx = hub.subscribe();
        assert_eq!(rx.borrow().event, SessionEvent::InitialSession);
    }

    #[tokio::test]
    async fn subscribers_see_sign_in_and_out() {
        let hub = SessionHub::default();
        let mut rx = hub.subscribe();

        hub.sign_in(Identity::new("u1"));
        rx.changed().await.unwrap();
        {
            let snap = rx.borrow_and_update();
            assert_eq!(snap.event, SessionEvent::SignedIn);
            assert_eq!(snap.identity, Some(Identity::new("u1")));
        }

        hub.sign_out();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.event, SessionEvent::SignedOut);
        assert!(snap.identity.is_none());
        assert!(hub.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn token_refresh_keeps_identity() {
        let hub = SessionHub::new(Some(Identity::new("u1")));
        let mut rx = hub.subscribe();

        hub.refresh_token();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.event, SessionEvent::TokenRefreshed);
        assert_eq!(snap.identity, Some(Identity::new("u1")));
    }

    #[tokio::test]
    async fn dropping_receiver_unsubscribes() {
        let hub = SessionHub::default();
        let rx = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(rx);
        assert_eq!(hub.subscriber_count(), 0);

        // Publishing with no subscribers still updates the snapshot.
        hub.sign_in(Identity::new("u2"));
        assert_eq!(
            hub.current_session().await.unwrap(),
            Some(Identity::new("u2"))
        );
    }

    #[tokio::test]
    async fn static_identity_answers_fixed_value() {
        let guest = StaticIdentity::guest();
        assert!(guest.current_session().await.unwrap().is_none());

        let user = StaticIdentity::new(Some(Identity::new("u9")));
        assert_eq!(
            user.current_session().await.unwrap(),
            Some(Identity::new("u9"))
        );
        assert_eq!(user.subscribe().borrow().identity, Some(Identity::new("u9")));
    }
}
