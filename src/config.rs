//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default number of normalized score cards kept in memory.
pub const DEFAULT_SCORE_CACHE_CAPACITY: usize = 512;

/// Service configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Port the HTTP server binds on `0.0.0.0`.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Maximum cached score cards before the oldest is evicted.
    pub score_cache_capacity: usize,
    /// Default tracing filter (`RUST_LOG` overrides it).
    pub log_filter: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            db_path: PathBuf::from("./data/scan-gate.db"),
            score_cache_capacity: DEFAULT_SCORE_CACHE_CAPACITY,
            log_filter: "info".to_string(),
        }
    }
}

impl GateConfig {
    /// Build from `SCAN_GATE_*` environment variables.
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = parse_or(&lookup, "SCAN_GATE_PORT", defaults.port);
        let score_cache_capacity = parse_or(
            &lookup,
            "SCAN_GATE_SCORE_CACHE_CAPACITY",
            defaults.score_cache_capacity,
        );
        let db_path = lookup("SCAN_GATE_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let log_filter = lookup("SCAN_GATE_LOG")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.log_filter);

        Self {
            port,
            db_path,
            score_cache_capacity,
            log_filter,
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.score_cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SCAN_GATE_SCORE_CACHE_CAPACITY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, fallback = %default, "Invalid config value");
            default
        }),
        None => default,
    }
}
