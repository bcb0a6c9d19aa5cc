//! Route guards for the onboarding, paywall and dashboard screens.
//!
//! All three are the same state machine ([`RouteGuard`]) with a different
//! [`GuardPolicy`]: whether guests pass, which destination counts as "stay",
//! and whether an unreadable access state fails open or closed.

pub mod navigator;
pub mod phase;
pub mod policy;
pub mod route_guard;

pub use navigator::{Navigator, RecordingNavigator};
pub use phase::{GuardMount, GuardPhase};
pub use policy::{GuardKind, GuardPolicy, Routing, UnavailablePolicy};
pub use route_guard::RouteGuard;
