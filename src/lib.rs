//! scan-gate: access gating for the onboarding, paywall and dashboard
//! screens, plus score normalization for scan analyses.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod routes;
pub mod scores;
pub mod store;
