//! `ProfileStore` trait: the profile/scan reads the access guards depend on,
//! plus the writes that move a user through onboarding and scanning.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Lifecycle of a scan record. Only completed scans count as paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a status string from the DB. Unknown values read as pending.
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted facial-analysis submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    pub id: Uuid,
    pub user_id: String,
    pub status: ScanStatus,
    /// Raw analysis payload as returned by the scoring backend.
    pub analysis: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The onboarding record kept on a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingRecord {
    pub completed: bool,
    #[serde(default)]
    pub answers: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Backend-agnostic store for profiles and scans.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Whether at least one completed scan exists for the user.
    async fn has_any_scan(&self, user_id: &str) -> Result<bool, DatabaseError>;

    /// Whether the user's onboarding record carries `completed = true`.
    ///
    /// A user without a profile has not completed onboarding.
    async fn get_onboarding_completed(&self, user_id: &str) -> Result<bool, DatabaseError>;

    /// Store questionnaire answers and mark onboarding completed.
    async fn complete_onboarding(
        &self,
        user_id: &str,
        answers: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<OnboardingRecord, DatabaseError>;

    /// Record a completed scan for the user.
    async fn record_scan(
        &self,
        user_id: &str,
        analysis: &serde_json::Value,
    ) -> Result<Scan, DatabaseError>;

    /// Get a scan by ID.
    async fn get_scan(&self, id: Uuid) -> Result<Option<Scan>, DatabaseError>;
}
