//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the recipe store.
//! - Apply schema migrations in deterministic order, once per `Database`.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Repositories must not read/write application data before `migrate()`
//!   succeeds.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::Database;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Config(ConfigError),
    /// The readiness probe failed on every attempt.
    NotReady { attempts: u32 },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A migration script failed; nothing from the failing batch is kept.
    Migration {
        version: u32,
        description: &'static str,
        source: rusqlite::Error,
    },
    /// The registry itself is malformed (gap or out-of-order version).
    InvalidRegistry { expected: u32, found: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "invalid database config: {err}"),
            Self::NotReady { attempts } => {
                write!(f, "database is not ready after {attempts} attempt(s)")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Migration {
                version,
                description,
                source,
            } => write!(f, "applying migration {version} ({description}): {source}"),
            Self::InvalidRegistry { expected, found } => write!(
                f,
                "migration registry out of order: expected version {expected}, found {found}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::NotReady { .. } => None,
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidRegistry { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
