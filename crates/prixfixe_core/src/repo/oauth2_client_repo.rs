//! OAuth2 client lookups that are not scoped to an owner.
//!
//! The authorization server resolves clients by their public `client_id`
//! before it knows which user is involved.

use super::owned_repo::SqliteRepository;
use super::RepoResult;
use crate::model::{OAuth2Client, OwnedEntity};
use crate::query::SelectBuilder;
use rusqlite::types::Value;

impl SqliteRepository<'_, OAuth2Client> {
    /// Live client registered under `client_id`, whoever owns it.
    pub fn get_by_client_id(&self, client_id: &str) -> RepoResult<OAuth2Client> {
        let builder = SelectBuilder::new(self.dialect, OAuth2Client::TABLE)
            .columns(OAuth2Client::COLUMNS)
            .where_null("archived_on")
            .where_eq("client_id", Value::Text(client_id.to_string()));
        let query = self.finish("get_by_client_id", &builder)?;
        self.scan_single(&query, "querying database for oauth2 client by client id")
    }
}
