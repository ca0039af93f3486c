//! Owner-scoped persistence for the recipe platform.
//!
//! Every record except users belongs to exactly one user and is soft-deleted.
//! Repositories borrow a migrated [`Database`] connection and expose one
//! uniform protocol ([`OwnedRepository`]) over all of them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{ConfigError, DatabaseConfig};
pub use db::{Database, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_for, logging_status};
pub use model::{DelimitedList, OwnedEntity, User, UserCreationInput};
pub use query::{EntityList, Pagination, QueryFilter, SortBy};
pub use repo::owned_repo::{OwnedRepository, SqliteRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};

/// Minimal health-check API for embedding hosts.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
