//! Error types for scan-gate.

use uuid::Uuid;

/// Top-level error type for service startup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Identity provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The session lookup did not settle. Guards stay pending on this.
    #[error("Authentication status unresolved: {reason}")]
    AuthUnresolved { reason: String },
}

/// Access-state resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// A profile or scan read failed. Each guard decides how to recover.
    #[error("Access state unavailable for user {user_id}: {source}")]
    StateUnavailable {
        user_id: String,
        #[source]
        source: DatabaseError,
    },
}

/// Score normalization errors.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("Analysis payload is not a JSON object")]
    NotAnObject,

    #[error("No recognizable scores in analysis payload")]
    NoScores,

    #[error("Scan {id} not found")]
    ScanNotFound { id: Uuid },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;

    fn validate_capacity(score_cache_capacity: usize) -> Result<()> {
        GateConfig {
            score_cache_capacity,
            ..GateConfig::default()
        }
        .validate()?;
        Ok(())
    }

    #[test]
    fn startup_errors_convert_into_error() {
        assert!(validate_capacity(8).is_ok());
        assert!(matches!(
            validate_capacity(0),
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));

        let err: Error = DatabaseError::Migration("V1 profiles_and_scans".into()).into();
        assert!(err.to_string().starts_with("Database error: Migration failed"));

        let err: Error = std::io::Error::other("address in use").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
