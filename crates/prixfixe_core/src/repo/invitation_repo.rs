//! Invitation lookup by code.

use super::owned_repo::SqliteRepository;
use super::RepoResult;
use crate::model::{Invitation, OwnedEntity};
use crate::query::SelectBuilder;
use rusqlite::types::Value;

impl SqliteRepository<'_, Invitation> {
    /// Live invitation carrying `code`. The redeeming user is not the owner,
    /// so the lookup ignores `belongs_to`.
    pub fn get_by_code(&self, code: &str) -> RepoResult<Invitation> {
        let builder = SelectBuilder::new(self.dialect, Invitation::TABLE)
            .columns(Invitation::COLUMNS)
            .where_null("archived_on")
            .where_eq("code", Value::Text(code.to_string()));
        let query = self.finish("get_by_code", &builder)?;
        self.scan_single(&query, "querying database for invitation by code")
    }
}
