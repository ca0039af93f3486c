//! Connection bootstrap and the migration latch.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections from `DatabaseConfig`.
//! - Configure connection pragmas required by repository behavior.
//! - Apply schema migrations at most once per `Database` value.
//!
//! # Invariants
//! - Opening never migrates; `migrate()` is explicit and latched.
//! - A failed migration leaves the latch unset so a later call retries.

use super::migrations::{apply_migrations, latest_version};
use super::{DbError, DbResult};
use crate::config::DatabaseConfig;
use crate::model::OwnedEntity;
use crate::repo::owned_repo::SqliteRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::repo::{RepoError, RepoResult};
use log::{error, info, warn};
use once_cell::unsync::OnceCell;
use rusqlite::{Connection, InterruptHandle};
use std::time::Instant;

/// Shared store handle. Every repository borrows its connection.
pub struct Database {
    conn: Connection,
    config: DatabaseConfig,
    migrated: OnceCell<usize>,
}

impl Database {
    /// Opens the store described by `config`.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        config.validate()?;
        let mode = if config.is_in_memory() { "memory" } else { "file" };
        let started_at = Instant::now();
        info!("event=db_open module=db status=start mode={mode}");

        let conn = match Connection::open(config.connection_details.trim()) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        if let Err(err) = configure_connection(&conn, config) {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }

        info!(
            "event=db_open module=db status=ok mode={mode} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(Self {
            conn,
            config: config.clone(),
            migrated: OnceCell::new(),
        })
    }

    /// Opens a private in-memory store with default settings.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DatabaseConfig::in_memory())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Handle that aborts the statement currently running on this connection.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Probes the store with `SELECT 1`, retrying per config.
    pub fn is_ready(&self) -> bool {
        let attempts = self.config.max_ping_attempts.max(1);
        for attempt in 1..=attempts {
            match self.conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0)) {
                Ok(_) => return true,
                Err(err) => {
                    warn!(
                        "event=db_ping module=db status=error attempt={attempt} max_attempts={attempts} error={err}"
                    );
                    if attempt < attempts {
                        std::thread::sleep(self.config.ping_interval());
                    }
                }
            }
        }
        false
    }

    /// Applies pending migrations. Only the first successful call does work.
    ///
    /// A failed migration is returned, never panicked on. The pending batch is
    /// rolled back, the handle stays unmigrated and a later call retries.
    ///
    /// # Errors
    /// - `DbError::NotReady` when the readiness probe fails.
    /// - `DbError::Migration` / `UnsupportedSchemaVersion` from the executor.
    pub fn migrate(&self) -> DbResult<()> {
        if !self.is_ready() {
            return Err(DbError::NotReady {
                attempts: self.config.max_ping_attempts,
            });
        }

        if self.migrated.get().is_some() {
            return Ok(());
        }

        let started_at = Instant::now();
        let applied = self
            .migrated
            .get_or_try_init(|| apply_migrations(&self.conn))?;
        info!(
            "event=db_migrate module=db status=ok applied={applied} latest={} duration_ms={}",
            latest_version(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Whether this handle has already run `migrate()` successfully.
    pub fn is_migrated(&self) -> bool {
        self.migrated.get().is_some()
    }

    /// Repository for one owned entity on this connection.
    ///
    /// # Errors
    /// - `RepoError::NotReady` before `migrate()` has succeeded.
    pub fn repository<E: OwnedEntity>(&self) -> RepoResult<SqliteRepository<'_, E>> {
        if !self.is_migrated() {
            return Err(RepoError::NotReady);
        }
        Ok(SqliteRepository::try_new(&self.conn)?.with_debug(self.config.debug))
    }

    /// Account repository on this connection.
    pub fn users(&self) -> RepoResult<SqliteUserRepository<'_>> {
        if !self.is_migrated() {
            return Err(RepoError::NotReady);
        }
        Ok(SqliteUserRepository::try_new(&self.conn)?.with_debug(self.config.debug))
    }
}

fn configure_connection(conn: &Connection, config: &DatabaseConfig) -> DbResult<()> {
    // Bundled builds may default enforcement to ON.
    let foreign_keys = if config.enforce_foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
    conn.busy_timeout(config.busy_timeout())?;
    Ok(())
}
