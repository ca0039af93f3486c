//! Repository layer for owner-scoped records and users.
//!
//! # Responsibility
//! - Expose the uniform owner-scoped protocol over every `OwnedEntity`.
//! - Map store failures into `RepoError`, keeping "no row" distinct.
//!
//! # Invariants
//! - Every read or write of an owned row is co-filtered by `belongs_to`,
//!   except the explicit cross-owner helpers (`get_all`, `get_all_count`,
//!   client and invitation lookups).
//! - `NotFound` is returned as-is and never wrapped.
//! - Statement text comes from `crate::query` only.

use crate::db::DbError;
use crate::logging::sql_preview;
use crate::query::{BuildResult, Query, QueryBuildError};
use log::{debug, error};
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod invitation_repo;
pub mod oauth2_client_repo;
pub mod owned_repo;
pub mod scan;
pub mod user_repo;
pub mod webhook_repo;

use scan::ScanError;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// No row matched a single-row lookup.
    NotFound,
    /// The store has not been migrated on this handle.
    NotReady,
    /// A statement could not be composed.
    Build(QueryBuildError),
    /// The store rejected or failed a statement.
    Query {
        context: String,
        source: rusqlite::Error,
    },
    Scan(ScanError),
    Db(DbError),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Query {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "no rows found"),
            Self::NotReady => write!(f, "database has not been migrated"),
            Self::Build(err) => write!(f, "building query: {err}"),
            Self::Query { context, source } => write!(f, "{context}: {source}"),
            Self::Scan(err) => write!(f, "scanning response from database: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{column}` in table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Build(err) => Some(err),
            Self::Query { source, .. } => Some(source),
            Self::Scan(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound
            | Self::NotReady
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ScanError> for RepoError {
    fn from(value: ScanError) -> Self {
        Self::Scan(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::NotReady { .. } => Self::NotReady,
            other => Self::Db(other),
        }
    }
}

impl From<QueryBuildError> for RepoError {
    fn from(value: QueryBuildError) -> Self {
        Self::Build(value)
    }
}

/// Unwraps a builder result, logging failures under `query_build_failed`.
pub(crate) fn built(
    table: &'static str,
    operation: &'static str,
    debug_sql: bool,
    result: BuildResult<Query>,
) -> RepoResult<Query> {
    match result {
        Ok(query) => {
            if debug_sql {
                debug!(
                    "event=query_build module=query status=ok table={table} op={operation} args={} sql={}",
                    query.args.len(),
                    sql_preview(&query.sql)
                );
            }
            Ok(query)
        }
        Err(err) => {
            error!(
                "event=query_build module=query status=error table={table} op={operation} error_code=query_build_failed error={err}"
            );
            Err(err.into())
        }
    }
}

/// Runs a single-row query; an empty result is `RepoError::NotFound`.
pub(crate) fn query_one<T, F>(
    conn: &Connection,
    query: &Query,
    context: &str,
    scan_one: F,
) -> RepoResult<T>
where
    F: FnOnce(&Row<'_>) -> Result<T, ScanError>,
{
    let mut stmt = conn
        .prepare(&query.sql)
        .map_err(|err| RepoError::query(context, err))?;
    let mut rows = stmt
        .query(params_from_iter(query.args.iter()))
        .map_err(|err| RepoError::query(context, err))?;
    let Some(row) = rows.next().map_err(|err| RepoError::query(context, err))? else {
        return Err(RepoError::NotFound);
    };
    let item = scan_one(row)?;
    Ok(item)
}

/// Runs a `COUNT(...)` query.
pub(crate) fn query_count(conn: &Connection, query: &Query, context: &str) -> RepoResult<u64> {
    let count = conn
        .query_row(&query.sql, params_from_iter(query.args.iter()), |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|err| RepoError::query(context, err))?;
    u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
}

/// Runs a `SELECT EXISTS ( ... )` query.
pub(crate) fn query_exists(conn: &Connection, query: &Query, context: &str) -> RepoResult<bool> {
    conn.query_row(&query.sql, params_from_iter(query.args.iter()), |row| {
        row.get::<_, bool>(0)
    })
    .map_err(|err| RepoError::query(context, err))
}

/// Runs an INSERT/UPDATE and returns the affected-row count.
pub(crate) fn execute(conn: &Connection, query: &Query, context: &str) -> RepoResult<usize> {
    conn.execute(&query.sql, params_from_iter(query.args.iter()))
        .map_err(|err| RepoError::query(context, err))
}

/// Checks that `table` exists and carries every column in `columns`.
pub(crate) fn ensure_table_ready(
    conn: &Connection,
    table: &'static str,
    columns: &'static [&'static str],
) -> RepoResult<()> {
    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }
    let present = table_columns(conn, table)?;
    for &column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get::<_, bool>(0),
    )
    .map_err(|err| RepoError::query(format!("checking table {table}"), err))
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let context = || format!("reading columns of {table}");
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table});"))
        .map_err(|err| RepoError::query(context(), err))?;
    let mut rows = stmt.query([]).map_err(|err| RepoError::query(context(), err))?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next().map_err(|err| RepoError::query(context(), err))? {
        columns.push(
            row.get::<_, String>(1)
                .map_err(|err| RepoError::query(context(), err))?,
        );
    }
    Ok(columns)
}
