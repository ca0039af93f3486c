//! Owner-scoped repository protocol and its SQLite implementation.
//!
//! # Responsibility
//! - Implement get/count/list/create/update/archive once for every
//!   `OwnedEntity`.
//! - Memoize the cross-owner statements, which never change.
//!
//! # Invariants
//! - Reads by id return archived rows; counts and listings never do.
//! - `update` and `archive` never touch a row owned by someone else.
//! - Archival only stamps live rows, so repeating it changes nothing.
//! - `create` runs two statements without a transaction.

use super::scan::{scan_many, ColumnCursor, ScanError};
use super::{built, ensure_table_ready, execute, query_count, query_exists, query_one};
use super::{RepoError, RepoResult};
use crate::model::{
    Ingredient, Instrument, Invitation, IterationMedia, OAuth2Client, OwnedEntity, Preparation,
    Recipe, RecipeIteration, RecipeStep, RecipeStepEvent, RecipeStepIngredient,
    RecipeStepInstrument, RecipeStepProduct, Report, RequiredPreparationInstrument, Webhook,
};
use crate::query::{
    u64_value, Dialect, EntityList, InsertBuilder, Query, QueryFilter, SelectBuilder, SortBy,
    UpdateBuilder,
};
use log::{debug, warn};
use once_cell::unsync::OnceCell;
use rusqlite::Connection;
use std::marker::PhantomData;

const COUNT_PROJECTION: &[&str] = &["COUNT(id)"];
const CREATED_ON_PROJECTION: &[&str] = &["created_on"];

/// Uniform data access for records owned by a single user.
pub trait OwnedRepository<E: OwnedEntity> {
    /// Row `id` owned by `owner`, archived or not.
    fn get(&self, id: u64, owner: u64) -> RepoResult<E>;
    /// Whether a live row `id` owned by `owner` exists.
    fn exists(&self, id: u64, owner: u64) -> RepoResult<bool>;
    /// Live rows of `owner` inside the filter's time window.
    fn count(&self, filter: Option<&QueryFilter>, owner: u64) -> RepoResult<u64>;
    /// Live rows of every owner.
    fn get_all_count(&self) -> RepoResult<u64>;
    /// Live rows of every owner.
    fn get_all(&self) -> RepoResult<Vec<E>>;
    /// One page of `owner`'s live rows; `None` uses the default filter.
    fn list(&self, filter: Option<&QueryFilter>, owner: u64) -> RepoResult<EntityList<E>>;
    /// Every live row of `owner`, unpaged.
    ///
    /// The result is unbounded; prefer `list` for anything user-facing.
    fn get_all_for_user(&self, owner: u64) -> RepoResult<Vec<E>>;
    /// Live rows of `owner` among `ids`, ascending by id, at most `limit`.
    fn get_with_ids(&self, owner: u64, limit: u32, ids: &[u64]) -> RepoResult<Vec<E>>;
    /// Inserts a row and returns it with store-assigned id and `created_on`.
    fn create(&self, input: E::Input) -> RepoResult<E>;
    /// Rewrites every payload column of the row matching id and owner.
    ///
    /// Returns the affected-row count; zero is not an error.
    fn update(&self, entity: &E) -> RepoResult<usize>;
    /// Tombstones a live row. Returns the affected-row count.
    fn archive(&self, id: u64, owner: u64) -> RepoResult<usize>;
}

/// SQLite-backed [`OwnedRepository`] borrowing a migrated connection.
pub struct SqliteRepository<'conn, E> {
    pub(super) conn: &'conn Connection,
    pub(super) dialect: Dialect,
    pub(super) debug_sql: bool,
    all_count_query: OnceCell<Query>,
    all_query: OnceCell<Query>,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: OwnedEntity> SqliteRepository<'conn, E> {
    /// Creates a repository after checking the entity table and projection.
    ///
    /// # Errors
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the connection
    ///   was not migrated.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, E::TABLE, E::COLUMNS)?;
        Ok(Self {
            conn,
            dialect: Dialect::Sqlite,
            debug_sql: false,
            all_count_query: OnceCell::new(),
            all_query: OnceCell::new(),
            _entity: PhantomData,
        })
    }

    /// Logs every built statement at `debug` level.
    pub fn with_debug(mut self, debug_sql: bool) -> Self {
        self.debug_sql = debug_sql;
        self
    }

    fn context(&self, action: &str) -> String {
        format!("{action} {}", E::NAME)
    }

    fn select(&self, columns: &[&str]) -> SelectBuilder {
        SelectBuilder::new(self.dialect, E::TABLE).columns(columns)
    }

    fn live_for_owner(&self, columns: &[&str], owner: u64) -> SelectBuilder {
        self.select(columns)
            .where_null("archived_on")
            .where_eq("belongs_to", u64_value(owner))
    }

    pub(super) fn finish(&self, operation: &'static str, builder: &SelectBuilder) -> RepoResult<Query> {
        built(E::TABLE, operation, self.debug_sql, builder.to_sql())
    }

    pub(super) fn scan_rows(&self, query: &Query) -> RepoResult<Vec<E>> {
        scan_many(self.conn, query, E::TABLE, |row| E::scan(row))
    }

    pub(super) fn scan_single(&self, query: &Query, context: &str) -> RepoResult<E> {
        query_one(self.conn, query, context, |row| E::scan(row))
    }

    fn get_query(&self, id: u64, owner: u64) -> RepoResult<Query> {
        let builder = self
            .select(E::COLUMNS)
            .where_eq("belongs_to", u64_value(owner))
            .where_eq("id", u64_value(id));
        self.finish("get", &builder)
    }

    fn exists_query(&self, id: u64, owner: u64) -> RepoResult<Query> {
        let builder = self
            .live_for_owner(&["id"], owner)
            .where_eq("id", u64_value(id));
        built(E::TABLE, "exists", self.debug_sql, builder.to_exists_sql())
    }

    fn count_query(&self, filter: Option<&QueryFilter>, owner: u64) -> RepoResult<Query> {
        let mut builder = self.live_for_owner(COUNT_PROJECTION, owner);
        if let Some(filter) = filter {
            filter.apply_predicates(&mut builder);
        }
        self.finish("count", &builder)
    }

    fn all_count_query(&self) -> RepoResult<&Query> {
        self.all_count_query.get_or_try_init(|| {
            let builder = self.select(COUNT_PROJECTION).where_null("archived_on");
            self.finish("get_all_count", &builder)
        })
    }

    fn all_query(&self) -> RepoResult<&Query> {
        self.all_query.get_or_try_init(|| {
            let builder = self.select(E::COLUMNS).where_null("archived_on");
            self.finish("get_all", &builder)
        })
    }

    fn list_query(&self, filter: &QueryFilter, owner: u64) -> RepoResult<Query> {
        let mut builder = self.live_for_owner(E::COLUMNS, owner);
        filter.apply(&mut builder);
        self.finish("list", &builder)
    }

    fn all_for_user_query(&self, owner: u64) -> RepoResult<Query> {
        let builder = self.live_for_owner(E::COLUMNS, owner);
        self.finish("get_all_for_user", &builder)
    }

    fn with_ids_query(&self, owner: u64, limit: u32, ids: &[u64]) -> RepoResult<Query> {
        let window = QueryFilter {
            limit,
            ..QueryFilter::default()
        };
        let mut builder = self
            .live_for_owner(E::COLUMNS, owner)
            .where_in("id", ids.iter().copied().map(u64_value).collect());
        builder.order_by("id", SortBy::Ascending);
        builder.set_limit(u64::from(window.effective_limit()));
        self.finish("get_with_ids", &builder)
    }

    fn create_query(&self, entity: &E) -> RepoResult<Query> {
        let mut values = entity.field_values();
        values.push(u64_value(entity.belongs_to()));
        let builder = InsertBuilder::new(self.dialect, E::TABLE)
            .columns(E::FIELDS.iter().copied().chain(["belongs_to"]))
            .values(values);
        built(E::TABLE, "create", self.debug_sql, builder.to_sql())
    }

    fn created_on_query(&self, id: u64) -> RepoResult<Query> {
        let builder = self
            .select(CREATED_ON_PROJECTION)
            .where_eq("id", u64_value(id));
        self.finish("created_on", &builder)
    }

    fn update_query(&self, entity: &E) -> RepoResult<Query> {
        let builder = E::FIELDS
            .iter()
            .zip(entity.field_values())
            .fold(UpdateBuilder::new(self.dialect, E::TABLE), |builder, (column, value)| {
                builder.set(column, value)
            })
            .set_now("updated_on")
            .where_eq("belongs_to", u64_value(entity.belongs_to()))
            .where_eq("id", u64_value(entity.id()));
        built(E::TABLE, "update", self.debug_sql, builder.to_sql())
    }

    fn archive_query(&self, id: u64, owner: u64) -> RepoResult<Query> {
        let builder = UpdateBuilder::new(self.dialect, E::TABLE)
            .set_now("updated_on")
            .set_now("archived_on")
            .where_null("archived_on")
            .where_eq("belongs_to", u64_value(owner))
            .where_eq("id", u64_value(id));
        built(E::TABLE, "archive", self.debug_sql, builder.to_sql())
    }

    fn fetch_created_on(&self, id: u64) -> RepoResult<u64> {
        let query = self.created_on_query(id)?;
        query_one(
            self.conn,
            &query,
            &self.context("fetching creation time of"),
            |row| -> Result<u64, ScanError> {
                ColumnCursor::new(row, E::TABLE, CREATED_ON_PROJECTION)?.read()
            },
        )
    }
}

impl<E: OwnedEntity> OwnedRepository<E> for SqliteRepository<'_, E> {
    fn get(&self, id: u64, owner: u64) -> RepoResult<E> {
        let query = self.get_query(id, owner)?;
        self.scan_single(&query, &self.context("querying database for"))
    }

    fn exists(&self, id: u64, owner: u64) -> RepoResult<bool> {
        let query = self.exists_query(id, owner)?;
        query_exists(
            self.conn,
            &query,
            &self.context("checking existence of"),
        )
    }

    fn count(&self, filter: Option<&QueryFilter>, owner: u64) -> RepoResult<u64> {
        let query = self.count_query(filter, owner)?;
        query_count(self.conn, &query, &self.context("counting"))
    }

    fn get_all_count(&self) -> RepoResult<u64> {
        let query = self.all_count_query()?;
        query_count(self.conn, query, &self.context("counting every"))
    }

    fn get_all(&self) -> RepoResult<Vec<E>> {
        let query = self.all_query()?;
        self.scan_rows(query)
    }

    fn list(&self, filter: Option<&QueryFilter>, owner: u64) -> RepoResult<EntityList<E>> {
        let filter = filter.cloned().unwrap_or_default();
        let query = self.list_query(&filter, owner)?;
        let items = self.scan_rows(&query)?;
        let total_count = self.count(Some(&filter), owner)?;
        Ok(EntityList {
            pagination: filter.pagination(total_count),
            items,
        })
    }

    fn get_all_for_user(&self, owner: u64) -> RepoResult<Vec<E>> {
        let query = self.all_for_user_query(owner)?;
        self.scan_rows(&query)
    }

    fn get_with_ids(&self, owner: u64, limit: u32, ids: &[u64]) -> RepoResult<Vec<E>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.with_ids_query(owner, limit, ids)?;
        self.scan_rows(&query)
    }

    fn create(&self, input: E::Input) -> RepoResult<E> {
        let mut entity = E::from_input(input);
        let query = self.create_query(&entity)?;
        execute(self.conn, &query, &self.context("creating"))?;

        let raw_id = self.conn.last_insert_rowid();
        let id = u64::try_from(raw_id)
            .map_err(|_| RepoError::InvalidData(format!("negative rowid {raw_id} in {}", E::TABLE)))?;

        let created_on = match self.fetch_created_on(id) {
            Ok(created_on) => created_on,
            Err(err) => {
                warn!(
                    "event=repo_create module=repo status=error table={} id={id} error_code=creation_time_retrieval_failed error={err}",
                    E::TABLE
                );
                0
            }
        };
        entity.assign_identity(id, created_on);

        debug!(
            "event=repo_create module=repo status=ok table={} id={id} owner={}",
            E::TABLE,
            entity.belongs_to()
        );
        Ok(entity)
    }

    fn update(&self, entity: &E) -> RepoResult<usize> {
        let query = self.update_query(entity)?;
        let changed = execute(self.conn, &query, &self.context("updating"))?;
        debug!(
            "event=repo_update module=repo status=ok table={} id={} changed={changed}",
            E::TABLE,
            entity.id()
        );
        Ok(changed)
    }

    fn archive(&self, id: u64, owner: u64) -> RepoResult<usize> {
        let query = self.archive_query(id, owner)?;
        let changed = execute(self.conn, &query, &self.context("archiving"))?;
        debug!(
            "event=repo_archive module=repo status=ok table={} id={id} changed={changed}",
            E::TABLE
        );
        Ok(changed)
    }
}

pub type OAuth2ClientRepository<'conn> = SqliteRepository<'conn, OAuth2Client>;
pub type WebhookRepository<'conn> = SqliteRepository<'conn, Webhook>;
pub type IngredientRepository<'conn> = SqliteRepository<'conn, Ingredient>;
pub type InstrumentRepository<'conn> = SqliteRepository<'conn, Instrument>;
pub type PreparationRepository<'conn> = SqliteRepository<'conn, Preparation>;
pub type RequiredPreparationInstrumentRepository<'conn> =
    SqliteRepository<'conn, RequiredPreparationInstrument>;
pub type RecipeRepository<'conn> = SqliteRepository<'conn, Recipe>;
pub type RecipeStepRepository<'conn> = SqliteRepository<'conn, RecipeStep>;
pub type RecipeStepInstrumentRepository<'conn> = SqliteRepository<'conn, RecipeStepInstrument>;
pub type RecipeStepIngredientRepository<'conn> = SqliteRepository<'conn, RecipeStepIngredient>;
pub type RecipeStepProductRepository<'conn> = SqliteRepository<'conn, RecipeStepProduct>;
pub type RecipeIterationRepository<'conn> = SqliteRepository<'conn, RecipeIteration>;
pub type RecipeStepEventRepository<'conn> = SqliteRepository<'conn, RecipeStepEvent>;
pub type IterationMediaRepository<'conn> = SqliteRepository<'conn, IterationMedia>;
pub type InvitationRepository<'conn> = SqliteRepository<'conn, Invitation>;
pub type ReportRepository<'conn> = SqliteRepository<'conn, Report>;

#[cfg(test)]
mod tests {
    use super::{InstrumentRepository, RecipeStepRepository};
    use crate::db::migrations::apply_migrations;
    use crate::model::{Instrument, InstrumentCreationInput, OwnedEntity};
    use crate::query::QueryFilter;
    use rusqlite::types::Value;
    use rusqlite::Connection;

    fn migrated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        conn
    }

    fn knife() -> Instrument {
        Instrument::from_input(InstrumentCreationInput {
            name: "knife".to_string(),
            belongs_to: 321,
            ..InstrumentCreationInput::default()
        })
    }

    #[test]
    fn get_statement_filters_by_owner_then_id() {
        let conn = migrated();
        let repo = InstrumentRepository::try_new(&conn).unwrap();
        let query = repo.get_query(123, 321).unwrap();
        assert_eq!(
            query.sql,
            "SELECT id, name, variant, description, icon, created_on, updated_on, archived_on, belongs_to FROM instruments WHERE belongs_to = ? AND id = ?"
        );
        assert_eq!(query.args, vec![Value::Integer(321), Value::Integer(123)]);
    }

    #[test]
    fn count_statement_never_carries_a_page_window() {
        let conn = migrated();
        let repo = InstrumentRepository::try_new(&conn).unwrap();
        let query = repo.count_query(Some(&QueryFilter::default()), 321).unwrap();
        assert_eq!(
            query.sql,
            "SELECT COUNT(id) FROM instruments WHERE archived_on IS NULL AND belongs_to = ?"
        );
    }

    #[test]
    fn all_count_statement_is_built_once() {
        let conn = migrated();
        let repo = InstrumentRepository::try_new(&conn).unwrap();
        let first = repo.all_count_query().unwrap() as *const _;
        let second = repo.all_count_query().unwrap() as *const _;
        assert_eq!(first, second);
        assert_eq!(
            repo.all_count_query().unwrap().sql,
            "SELECT COUNT(id) FROM instruments WHERE archived_on IS NULL"
        );
    }

    #[test]
    fn create_and_created_on_statements() {
        let conn = migrated();
        let repo = InstrumentRepository::try_new(&conn).unwrap();
        assert_eq!(
            repo.create_query(&knife()).unwrap().sql,
            "INSERT INTO instruments (name,variant,description,icon,belongs_to) VALUES (?,?,?,?,?)"
        );
        assert_eq!(
            repo.created_on_query(1).unwrap().sql,
            "SELECT created_on FROM instruments WHERE id = ?"
        );
    }

    #[test]
    fn update_and_archive_statements() {
        let conn = migrated();
        let repo = InstrumentRepository::try_new(&conn).unwrap();
        let mut instrument = knife();
        instrument.id = 1;
        assert_eq!(
            repo.update_query(&instrument).unwrap().sql,
            "UPDATE instruments SET name = ?, variant = ?, description = ?, icon = ?, updated_on = (strftime('%s','now')) WHERE belongs_to = ? AND id = ?"
        );
        assert_eq!(
            repo.archive_query(1, 321).unwrap().sql,
            "UPDATE instruments SET updated_on = (strftime('%s','now')), archived_on = (strftime('%s','now')) WHERE archived_on IS NULL AND belongs_to = ? AND id = ?"
        );
    }

    #[test]
    fn list_statement_applies_the_filter_window() {
        let conn = migrated();
        let repo = InstrumentRepository::try_new(&conn).unwrap();
        let query = repo.list_query(&QueryFilter::default(), 321).unwrap();
        assert_eq!(
            query.sql,
            "SELECT id, name, variant, description, icon, created_on, updated_on, archived_on, belongs_to FROM instruments WHERE archived_on IS NULL AND belongs_to = ? ORDER BY created_on ASC, id ASC LIMIT 20"
        );
    }

    #[test]
    fn keyword_column_is_quoted_in_recipe_steps() {
        let conn = migrated();
        let repo = RecipeStepRepository::try_new(&conn).unwrap();
        let query = repo.all_for_user_query(1).unwrap();
        assert!(query.sql.starts_with("SELECT id, \"index\", preparation_id"));
    }

    #[test]
    fn unmigrated_connection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(InstrumentRepository::try_new(&conn).is_err());
    }
}
