//! Navigation side of a guard.

use std::sync::Mutex;

use crate::access::Destination;

/// Performs navigations on behalf of a guard.
pub trait Navigator: Send + Sync {
    /// Replace the current location; history does not grow.
    fn replace(&self, to: Destination);
}

/// Navigator that records every replacement instead of performing it.
///
/// Used by the HTTP surface to report a guard's redirect to the client.
#[derive(Default)]
pub struct RecordingNavigator {
    replaced: Mutex<Vec<Destination>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All destinations navigated to, oldest first.
    pub fn history(&self) -> Vec<Destination> {
        self.replaced
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Destination> {
        self.history().last().copied()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, to: Destination) {
        if let Ok(mut replaced) = self.replaced.lock() {
            replaced.push(to);
        }
    }
}
