//! Store connection configuration.
//!
//! # Invariants
//! - `connection_details` is never empty after `validate()`.
//! - Readiness probing makes at least one attempt.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const IN_MEMORY_DSN: &str = ":memory:";

/// Configuration errors surfaced by [`DatabaseConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyConnectionDetails,
    InvalidPingAttempts(u32),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyConnectionDetails => write!(f, "connection_details cannot be empty"),
            Self::InvalidPingAttempts(value) => {
                write!(f, "max_ping_attempts must be at least 1, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Connection settings for the SQLite store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// File path or SQLite URI. `:memory:` opens a private in-memory store.
    pub connection_details: String,
    /// Logs every built SQL statement at `debug` level.
    pub debug: bool,
    /// Turns on `PRAGMA foreign_keys`; owner references are only declarative
    /// otherwise.
    pub enforce_foreign_keys: bool,
    pub busy_timeout_ms: u64,
    pub max_ping_attempts: u32,
    pub ping_interval_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_details: IN_MEMORY_DSN.to_string(),
            debug: false,
            enforce_foreign_keys: false,
            busy_timeout_ms: 5_000,
            max_ping_attempts: 3,
            ping_interval_ms: 100,
        }
    }
}

impl DatabaseConfig {
    /// Config for a file-backed (or URI) store with default tuning.
    pub fn new(connection_details: impl Into<String>) -> Self {
        Self {
            connection_details: connection_details.into(),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn is_in_memory(&self) -> bool {
        self.connection_details.trim() == IN_MEMORY_DSN
    }

    /// Log level matching the debug flag.
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            crate::logging::default_log_level()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_details.trim().is_empty() {
            return Err(ConfigError::EmptyConnectionDetails);
        }
        if self.max_ping_attempts == 0 {
            return Err(ConfigError::InvalidPingAttempts(self.max_ping_attempts));
        }
        Ok(())
    }
}
