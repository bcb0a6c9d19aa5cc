//! Persistence layer: profile and scan records behind `ProfileStore`.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{OnboardingRecord, ProfileStore, Scan, ScanStatus};
