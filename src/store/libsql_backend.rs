//! libSQL backend: async `ProfileStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{OnboardingRecord, ProfileStore, Scan, ScanStatus};

/// Profile and scan records in a libSQL database.
///
/// All queries share one connection; `libsql::Connection` is safe to use
/// from concurrent tasks.
pub struct LibSqlBackend {
    // Keeps the database open for as long as the connection is in use.
    _db: LibSqlDatabase,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open the database file at `path`, creating it and its directory if
    /// missing, and bring the schema up to date.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| DatabaseError::Pool(format!("{}: {e}", dir.display())))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("{}: {e}", path.display())))?;
        let backend = Self::with_schema(db).await?;
        info!(path = %path.display(), "Profile database ready");
        Ok(backend)
    }

    /// A throwaway in-memory database, used by tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("in-memory database: {e}")))?;
        Self::with_schema(db).await
    }

    async fn with_schema(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("connect: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self { _db: db, conn })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

const SCAN_COLUMNS: &str = "id, user_id, status, analysis, created_at";

fn row_to_scan(row: &libsql::Row) -> Result<Scan, DatabaseError> {
    let get_text = |idx: i32| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("row_to_scan column {idx}: {e}")))
    };

    let id_str = get_text(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| DatabaseError::Serialization(format!("scan id {id_str}: {e}")))?;
    let analysis_str = get_text(3)?;
    let analysis = serde_json::from_str(&analysis_str)
        .map_err(|e| DatabaseError::Serialization(format!("scan {id} analysis: {e}")))?;

    Ok(Scan {
        id,
        user_id: get_text(1)?,
        status: ScanStatus::parse(&get_text(2)?),
        analysis,
        created_at: parse_datetime(&get_text(4)?),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn has_any_scan(&self, user_id: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT EXISTS(SELECT 1 FROM scans WHERE user_id = ?1 AND status = 'completed')",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("has_any_scan: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let exists: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("has_any_scan: {e}")))?;
                Ok(exists != 0)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(DatabaseError::Query(format!("has_any_scan: {e}"))),
        }
    }

    async fn get_onboarding_completed(&self, user_id: &str) -> Result<bool, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT onboarding FROM profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_onboarding_completed: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_onboarding_completed: {e}")))?;
                let record: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
                    DatabaseError::Serialization(format!("onboarding record for {user_id}: {e}"))
                })?;
                Ok(record
                    .get("completed")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false))
            }
            Ok(None) => Ok(false),
            Err(e) => Err(DatabaseError::Query(format!("get_onboarding_completed: {e}"))),
        }
    }

    async fn complete_onboarding(
        &self,
        user_id: &str,
        answers: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<OnboardingRecord, DatabaseError> {
        let now = Utc::now();
        let record = OnboardingRecord {
            completed: true,
            answers: answers.clone(),
            completed_at: Some(now),
        };
        let record_str = serde_json::to_string(&record)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO profiles (user_id, onboarding, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT (user_id) DO UPDATE SET onboarding = ?2, updated_at = ?3",
                params![user_id, record_str, now.to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("complete_onboarding: {e}")))?;

        debug!(user_id, answers = answers.len(), "Onboarding completed");
        Ok(record)
    }

    async fn record_scan(
        &self,
        user_id: &str,
        analysis: &serde_json::Value,
    ) -> Result<Scan, DatabaseError> {
        let scan = Scan {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            status: ScanStatus::Completed,
            analysis: analysis.clone(),
            created_at: Utc::now(),
        };
        let analysis_str = serde_json::to_string(analysis)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO scans (id, user_id, status, analysis, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    scan.id.to_string(),
                    user_id,
                    scan.status.as_str(),
                    analysis_str,
                    scan.created_at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_scan: {e}")))?;

        debug!(user_id, scan_id = %scan.id, "Scan recorded");
        Ok(scan)
    }

    async fn get_scan(&self, id: Uuid) -> Result<Option<Scan>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_scan: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_scan(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_scan: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn answers(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn unknown_user_has_nothing() {
        let db = test_db().await;
        assert!(!db.has_any_scan("nobody").await.unwrap());
        assert!(!db.get_onboarding_completed("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn complete_onboarding_sets_flag() {
        let db = test_db().await;
        let record = db
            .complete_onboarding("u1", &answers(json!({"goal": "jawline"})))
            .await
            .unwrap();

        assert!(record.completed);
        assert!(record.completed_at.is_some());
        assert!(db.get_onboarding_completed("u1").await.unwrap());
        assert!(!db.get_onboarding_completed("u2").await.unwrap());
    }

    #[tokio::test]
    async fn resubmitting_onboarding_overwrites_answers() {
        let db = test_db().await;
        db.complete_onboarding("u1", &answers(json!({"goal": "skin"})))
            .await
            .unwrap();
        db.complete_onboarding("u1", &answers(json!({"goal": "jawline", "age": 24})))
            .await
            .unwrap();

        let mut rows = db
            .conn()
            .query("SELECT onboarding FROM profiles WHERE user_id = 'u1'", ())
            .await
            .unwrap();
        let raw: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        let stored: OnboardingRecord = serde_json::from_str(&raw).unwrap();
        assert!(stored.completed);
        assert_eq!(stored.answers["goal"], "jawline");
        assert_eq!(stored.answers["age"], 24);
    }

    #[tokio::test]
    async fn profile_without_completed_flag_reads_false() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO profiles (user_id, onboarding, created_at, updated_at) VALUES ('u1', '{\"answers\":{}}', 'now', 'now')",
                (),
            )
            .await
            .unwrap();
        assert!(!db.get_onboarding_completed("u1").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_onboarding_record_is_an_error() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO profiles (user_id, onboarding, created_at, updated_at) VALUES ('u1', 'not json', 'now', 'now')",
                (),
            )
            .await
            .unwrap();
        let err = db.get_onboarding_completed("u1").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Serialization(_)));
    }

    #[tokio::test]
    async fn record_and_get_scan() {
        let db = test_db().await;
        let analysis = json!({"overall": 7.5});
        let scan = db.record_scan("u1", &analysis).await.unwrap();

        assert_eq!(scan.status, ScanStatus::Completed);
        assert!(db.has_any_scan("u1").await.unwrap());

        let fetched = db.get_scan(scan.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, scan.id);
        assert_eq!(fetched.user_id, "u1");
        assert_eq!(fetched.analysis, analysis);
    }

    #[tokio::test]
    async fn get_scan_not_found() {
        let db = test_db().await;
        assert!(db.get_scan(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_completed_scans_count() {
        let db = test_db().await;
        for status in ["pending", "failed"] {
            db.conn()
                .execute(
                    "INSERT INTO scans (id, user_id, status, analysis, created_at) VALUES (?1, 'u1', ?2, '{}', ?3)",
                    params![Uuid::new_v4().to_string(), status, Utc::now().to_rfc3339()],
                )
                .await
                .unwrap();
        }
        assert!(!db.has_any_scan("u1").await.unwrap());

        db.record_scan("u1", &json!({})).await.unwrap();
        assert!(db.has_any_scan("u1").await.unwrap());
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/gate.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.complete_onboarding("u1", &answers(json!({"goal": "eyes"})))
                .await
                .unwrap();
        }

        let reopened = LibSqlBackend::new_local(&path).await.unwrap();
        assert!(reopened.get_onboarding_completed("u1").await.unwrap());
    }
}
