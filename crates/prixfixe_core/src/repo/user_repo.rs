//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist accounts and password rotations.
//! - Keep username uniqueness in the schema, not in application code.
//!
//! # Invariants
//! - Users are addressed by id alone; there is no owner column.
//! - Password hashes arrive hashed and are stored verbatim.
//! - Archival is one-way and repeating it changes nothing.

use super::scan::scan_many;
use super::{built, ensure_table_ready, execute, query_count, query_one, RepoError, RepoResult};
use crate::model::user::{User, UserCreationInput, USERS_TABLE, USER_COLUMNS};
use crate::query::{
    u64_value, BindValue, Dialect, EntityList, InsertBuilder, Query, QueryFilter, SelectBuilder,
    UpdateBuilder,
};
use log::{info, warn};
use once_cell::unsync::OnceCell;
use rusqlite::types::Value;
use rusqlite::Connection;

const COUNT_PROJECTION: &[&str] = &["COUNT(id)"];
const CREATED_ON_PROJECTION: &[&str] = &["created_on"];

/// Account persistence.
pub trait UserRepository {
    /// User `id`, archived or not.
    fn get_user(&self, id: u64) -> RepoResult<User>;
    fn get_user_by_username(&self, username: &str) -> RepoResult<User>;
    /// Live users inside the filter's time window.
    fn get_user_count(&self, filter: Option<&QueryFilter>) -> RepoResult<u64>;
    fn get_all_users_count(&self) -> RepoResult<u64>;
    fn get_users(&self, filter: Option<&QueryFilter>) -> RepoResult<EntityList<User>>;
    /// Registers an account. A taken username fails with `RepoError::Query`.
    fn create_user(&self, input: UserCreationInput) -> RepoResult<User>;
    /// Rewrites username, password hash and two-factor secret.
    fn update_user(&self, user: &User) -> RepoResult<usize>;
    /// Replaces the password hash and stamps `password_last_changed_on`.
    fn update_user_password(&self, id: u64, hashed_password: &str) -> RepoResult<usize>;
    fn archive_user(&self, id: u64) -> RepoResult<usize>;
}

/// SQLite-backed [`UserRepository`].
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
    dialect: Dialect,
    debug_sql: bool,
    all_count_query: OnceCell<Query>,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, USERS_TABLE, USER_COLUMNS)?;
        Ok(Self {
            conn,
            dialect: Dialect::Sqlite,
            debug_sql: false,
            all_count_query: OnceCell::new(),
        })
    }

    pub fn with_debug(mut self, debug_sql: bool) -> Self {
        self.debug_sql = debug_sql;
        self
    }

    fn select(&self, columns: &[&str]) -> SelectBuilder {
        SelectBuilder::new(self.dialect, USERS_TABLE).columns(columns)
    }

    fn finish_select(&self, operation: &'static str, builder: &SelectBuilder) -> RepoResult<Query> {
        built(USERS_TABLE, operation, self.debug_sql, builder.to_sql())
    }

    fn finish_update(&self, operation: &'static str, builder: UpdateBuilder) -> RepoResult<Query> {
        built(USERS_TABLE, operation, self.debug_sql, builder.to_sql())
    }

    fn fetch_one(&self, query: &Query) -> RepoResult<User> {
        query_one(self.conn, query, "querying database for user", |row| {
            User::scan(row)
        })
    }

    fn count_query(&self, filter: Option<&QueryFilter>) -> RepoResult<Query> {
        let mut builder = self.select(COUNT_PROJECTION).where_null("archived_on");
        if let Some(filter) = filter {
            filter.apply_predicates(&mut builder);
        }
        self.finish_select("count", &builder)
    }

    fn fetch_created_on(&self, id: u64) -> RepoResult<u64> {
        let builder = self
            .select(CREATED_ON_PROJECTION)
            .where_eq("id", u64_value(id));
        let query = self.finish_select("created_on", &builder)?;
        query_one(self.conn, &query, "fetching creation time of user", |row| {
            super::scan::ColumnCursor::new(row, USERS_TABLE, CREATED_ON_PROJECTION)?.read()
        })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get_user(&self, id: u64) -> RepoResult<User> {
        let builder = self.select(USER_COLUMNS).where_eq("id", u64_value(id));
        let query = self.finish_select("get", &builder)?;
        self.fetch_one(&query)
    }

    fn get_user_by_username(&self, username: &str) -> RepoResult<User> {
        let builder = self
            .select(USER_COLUMNS)
            .where_eq("username", Value::Text(username.to_string()));
        let query = self.finish_select("get_by_username", &builder)?;
        self.fetch_one(&query)
    }

    fn get_user_count(&self, filter: Option<&QueryFilter>) -> RepoResult<u64> {
        let query = self.count_query(filter)?;
        query_count(self.conn, &query, "counting users")
    }

    fn get_all_users_count(&self) -> RepoResult<u64> {
        let query = self
            .all_count_query
            .get_or_try_init(|| self.count_query(None))?;
        query_count(self.conn, query, "counting every user")
    }

    fn get_users(&self, filter: Option<&QueryFilter>) -> RepoResult<EntityList<User>> {
        let filter = filter.cloned().unwrap_or_default();
        let mut builder = self.select(USER_COLUMNS).where_null("archived_on");
        filter.apply(&mut builder);
        let query = self.finish_select("list", &builder)?;
        let items = scan_many(self.conn, &query, USERS_TABLE, |row| User::scan(row))?;
        let total_count = self.get_user_count(Some(&filter))?;
        Ok(EntityList {
            pagination: filter.pagination(total_count),
            items,
        })
    }

    fn create_user(&self, input: UserCreationInput) -> RepoResult<User> {
        let builder = InsertBuilder::new(self.dialect, USERS_TABLE)
            .columns(["username", "hashed_password", "two_factor_secret", "is_admin"])
            .values(vec![
                input.username.bind_value(),
                input.hashed_password.bind_value(),
                input.two_factor_secret.bind_value(),
                input.is_admin.bind_value(),
            ]);
        let query = built(USERS_TABLE, "create", self.debug_sql, builder.to_sql())?;
        execute(self.conn, &query, "creating user")?;

        let raw_id = self.conn.last_insert_rowid();
        let id = u64::try_from(raw_id)
            .map_err(|_| RepoError::InvalidData(format!("negative rowid {raw_id} in users")))?;
        let created_on = self.fetch_created_on(id).unwrap_or_else(|err| {
            warn!(
                "event=repo_create module=repo status=error table=users id={id} error_code=creation_time_retrieval_failed error={err}"
            );
            0
        });

        info!("event=user_create module=repo status=ok id={id}");
        Ok(User {
            id,
            username: input.username,
            hashed_password: input.hashed_password,
            password_last_changed_on: None,
            two_factor_secret: input.two_factor_secret,
            is_admin: input.is_admin,
            created_on,
            updated_on: None,
            archived_on: None,
        })
    }

    fn update_user(&self, user: &User) -> RepoResult<usize> {
        let builder = UpdateBuilder::new(self.dialect, USERS_TABLE)
            .set("username", user.username.bind_value())
            .set("hashed_password", user.hashed_password.bind_value())
            .set("two_factor_secret", user.two_factor_secret.bind_value())
            .set_now("updated_on")
            .where_eq("id", u64_value(user.id));
        let query = self.finish_update("update", builder)?;
        execute(self.conn, &query, "updating user")
    }

    fn update_user_password(&self, id: u64, hashed_password: &str) -> RepoResult<usize> {
        let builder = UpdateBuilder::new(self.dialect, USERS_TABLE)
            .set("hashed_password", Value::Text(hashed_password.to_string()))
            .set_now("password_last_changed_on")
            .set_now("updated_on")
            .where_eq("id", u64_value(id));
        let query = self.finish_update("update_password", builder)?;
        let changed = execute(self.conn, &query, "updating user password")?;
        info!("event=user_password_update module=repo status=ok id={id} changed={changed}");
        Ok(changed)
    }

    fn archive_user(&self, id: u64) -> RepoResult<usize> {
        let builder = UpdateBuilder::new(self.dialect, USERS_TABLE)
            .set_now("updated_on")
            .set_now("archived_on")
            .where_null("archived_on")
            .where_eq("id", u64_value(id));
        let query = self.finish_update("archive", builder)?;
        let changed = execute(self.conn, &query, "archiving user")?;
        info!("event=user_archive module=repo status=ok id={id} changed={changed}");
        Ok(changed)
    }
}
