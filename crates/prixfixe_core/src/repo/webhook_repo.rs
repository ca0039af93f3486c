//! Cross-owner webhook listing for the dispatcher.

use super::owned_repo::SqliteRepository;
use super::{query_count, RepoResult};
use crate::model::{OwnedEntity, Webhook};
use crate::query::{EntityList, QueryFilter, SelectBuilder};

const COUNT_PROJECTION: &[&str] = &["COUNT(id)"];

impl SqliteRepository<'_, Webhook> {
    /// One page of live webhooks across every owner.
    pub fn list_all(&self, filter: Option<&QueryFilter>) -> RepoResult<EntityList<Webhook>> {
        let filter = filter.cloned().unwrap_or_default();

        let mut rows = SelectBuilder::new(self.dialect, Webhook::TABLE)
            .columns(Webhook::COLUMNS)
            .where_null("archived_on");
        filter.apply(&mut rows);
        let rows_query = self.finish("list_all", &rows)?;
        let items = self.scan_rows(&rows_query)?;

        let mut count = SelectBuilder::new(self.dialect, Webhook::TABLE)
            .columns(COUNT_PROJECTION)
            .where_null("archived_on");
        filter.apply_predicates(&mut count);
        let count_query = self.finish("list_all_count", &count)?;
        let total_count = query_count(self.conn, &count_query, "counting every webhook")?;

        Ok(EntityList {
            pagination: filter.pagination(total_count),
            items,
        })
    }
}
