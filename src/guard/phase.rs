//! Guard phases and the mount handle that owns them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::access::Destination;

/// Where a guard is in one navigation check.
///
/// Pending → Allowed, or Pending → Redirecting. Both outcomes are terminal
/// for the check that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GuardPhase {
    /// Session or access state not known yet; show a loading indicator.
    Pending,
    /// Render the guarded content.
    Allowed,
    /// Replace the current location with `target`; render nothing.
    Redirecting { target: Destination },
}

impl GuardPhase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: GuardPhase) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Allowed) | (Self::Pending, Self::Redirecting { .. })
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether the guarded content should be rendered.
    pub fn renders_content(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn redirect_target(&self) -> Option<Destination> {
        match self {
            Self::Redirecting { target } => Some(*target),
            _ => None,
        }
    }
}

impl std::fmt::Display for GuardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Allowed => write!(f, "allowed"),
            Self::Redirecting { target } => write!(f, "redirecting({target})"),
        }
    }
}

struct MountInner {
    alive: watch::Sender<bool>,
    phase: watch::Sender<GuardPhase>,
}

/// Lifetime of one mounted guard.
///
/// Holds the liveness flag checked before every phase change and the
/// current phase for renderers. Clones share the same mount. A mount ends
/// at its first redirect; later checks against it are no-ops.
#[derive(Clone)]
pub struct GuardMount {
    inner: Arc<MountInner>,
}

impl GuardMount {
    pub fn new() -> Self {
        let (alive, _) = watch::channel(true);
        let (phase, _) = watch::channel(GuardPhase::Pending);
        Self {
            inner: Arc::new(MountInner { alive, phase }),
        }
    }

    pub fn is_mounted(&self) -> bool {
        *self.inner.alive.borrow()
    }

    /// Tear the guard down. Results still in flight are discarded.
    pub fn unmount(&self) {
        self.inner.alive.send_replace(false);
    }

    /// Resolves once the guard has been torn down.
    pub async fn unmounted(&self) {
        let mut rx = self.inner.alive.subscribe();
        // Err means the sender is gone, which cannot happen while `self` lives.
        let _ = rx.wait_for(|alive| !*alive).await;
    }

    pub fn phase(&self) -> GuardPhase {
        *self.inner.phase.borrow()
    }

    /// Observe phase changes, e.g. to swap a spinner for content.
    pub fn watch_phase(&self) -> watch::Receiver<GuardPhase> {
        self.inner.phase.subscribe()
    }

    /// Start a new check: the phase goes back to Pending.
    ///
    /// Refused once the mount has redirected, since the guarded location is
    /// already gone. An Allowed mount may be re-checked after a session
    /// change.
    pub(crate) fn begin(&self) -> bool {
        if matches!(self.phase(), GuardPhase::Redirecting { .. }) {
            return false;
        }
        self.inner.phase.send_replace(GuardPhase::Pending);
        true
    }

    /// Move to `next` if still mounted and the transition is valid.
    pub(crate) fn advance(&self, next: GuardPhase) -> bool {
        if !self.is_mounted() {
            return false;
        }
        let current = self.phase();
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "Rejected guard phase transition");
            return false;
        }
        self.inner.phase.send_replace(next);
        true
    }
}

impl Default for GuardMount {
    fn default() -> Self {
        Self::new()
    }
}
