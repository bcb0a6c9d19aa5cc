//! Schema versions for the profile store.
//!
//! `_migrations` records every applied version; opening a database applies
//! whatever is newer than the highest recorded one, in order.

use libsql::{Connection, params};
use tracing::{debug, info};

use crate::error::DatabaseError;

/// One schema version.
#[derive(Clone, Copy)]
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// Schema history, oldest first. New versions go at the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "profiles_and_scans",
        sql: r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                onboarding TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                analysis TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_scans_user ON scans(user_id);
        "#,
    },
    Migration {
        version: 2,
        name: "scans_user_status_index",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_scans_user_status ON scans(user_id, status);
        "#,
    },
];

/// Bring the schema on `conn` up to the latest version.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("_migrations table: {e}")))?;

    let applied = get_current_version(conn).await?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > applied);

    let mut latest = applied;
    for migration in pending {
        apply(conn, migration).await?;
        latest = migration.version;
    }

    debug!(from = applied, to = latest, "Profile schema up to date");
    Ok(())
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    let Migration { version, name, sql } = *migration;
    info!(version, name, "Applying schema migration");

    conn.execute_batch(sql)
        .await
        .map_err(|e| DatabaseError::Migration(format!("V{version} {name}: {e}")))?;
    seed_version(conn, version, name).await
}

/// Highest applied version; 0 on a fresh database.
async fn get_current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let version_err = |e: libsql::Error| DatabaseError::Migration(format!("schema version: {e}"));

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(version_err)?;
    match rows.next().await.map_err(version_err)? {
        Some(row) => row.get::<i64>(0).map_err(version_err),
        None => Ok(0),
    }
}

async fn seed_version(conn: &Connection, version: i64, name: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        params![version, name],
    )
    .await
    .map_err(|e| DatabaseError::Migration(format!("recording V{version}: {e}")))?;
    Ok(())
}
