//! Pagination and time-window filters for owner-scoped listings.
//!
//! # Invariants
//! - `page()` is never zero and `effective_limit()` is within
//!   `1..=MAX_QUERY_FILTER_LIMIT`.
//! - Time bounds are inclusive; an absent bound is unbounded.
//! - Counting queries take predicates only, never LIMIT/OFFSET.

use super::{u64_value, Comparison, SelectBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUERY_FILTER_LIMIT: u32 = 20;
pub const MAX_QUERY_FILTER_LIMIT: u32 = 50;
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Direction of the `created_on` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortBy {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortBy {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Ascending),
            "desc" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Page window plus optional creation/update time bounds (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub page: u64,
    pub limit: u32,
    pub created_after: Option<u64>,
    pub created_before: Option<u64>,
    pub updated_after: Option<u64>,
    pub updated_before: Option<u64>,
    pub sort_by: SortBy,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_QUERY_FILTER_LIMIT,
            created_after: None,
            created_before: None,
            updated_after: None,
            updated_before: None,
            sort_by: SortBy::Ascending,
        }
    }
}

impl QueryFilter {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Limit with zero mapped to the default and large values clamped.
    pub fn effective_limit(&self) -> u32 {
        match self.limit {
            0 => DEFAULT_QUERY_FILTER_LIMIT,
            value if value > MAX_QUERY_FILTER_LIMIT => MAX_QUERY_FILTER_LIMIT,
            value => value,
        }
    }

    /// Rows skipped before this page, capped at the store's largest integer.
    pub fn offset(&self) -> u64 {
        (self.page() - 1)
            .saturating_mul(u64::from(self.effective_limit()))
            .min(MAX_OFFSET)
    }

    /// Adds the time-bound predicates only.
    pub fn apply_predicates(&self, builder: &mut SelectBuilder) {
        let bounds = [
            ("created_on", Comparison::GreaterOrEqual, self.created_after),
            ("created_on", Comparison::LessOrEqual, self.created_before),
            ("updated_on", Comparison::GreaterOrEqual, self.updated_after),
            ("updated_on", Comparison::LessOrEqual, self.updated_before),
        ];
        for (column, comparison, bound) in bounds {
            if let Some(bound) = bound {
                builder.where_cmp(column, comparison, u64_value(bound));
            }
        }
    }

    /// Adds predicates, ordering and the page window.
    pub fn apply(&self, builder: &mut SelectBuilder) {
        self.apply_predicates(builder);
        builder.order_by("created_on", self.sort_by);
        builder.order_by("id", self.sort_by);
        builder.set_limit(u64::from(self.effective_limit()));
        builder.set_offset(self.offset());
    }

    pub fn pagination(&self, total_count: u64) -> Pagination {
        Pagination {
            page: self.page(),
            limit: self.effective_limit(),
            total_count,
        }
    }

    /// Builds a filter from URL-style key/value pairs.
    ///
    /// Unknown keys and unparsable values are ignored and leave the default
    /// in place.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "page" => {
                    if let Ok(page) = value.parse() {
                        filter.page = page;
                    }
                }
                "limit" => {
                    if let Ok(limit) = value.parse() {
                        filter.limit = limit;
                    }
                }
                "created_after" => filter.created_after = value.parse().ok(),
                "created_before" => filter.created_before = value.parse().ok(),
                "updated_after" => filter.updated_after = value.parse().ok(),
                "updated_before" => filter.updated_before = value.parse().ok(),
                "sort_by" => {
                    if let Some(sort_by) = SortBy::parse(value) {
                        filter.sort_by = sort_by;
                    }
                }
                _ => {}
            }
        }
        filter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u32,
    pub total_count: u64,
}

/// One page of entities with its pagination header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityList<E> {
    pub pagination: Pagination,
    pub items: Vec<E>,
}

#[cfg(test)]
mod tests {
    use super::{QueryFilter, SortBy, DEFAULT_QUERY_FILTER_LIMIT, MAX_QUERY_FILTER_LIMIT};
    use crate::query::{Dialect, SelectBuilder};

    #[test]
    fn zero_page_and_limit_fall_back_to_defaults() {
        let filter = QueryFilter {
            page: 0,
            limit: 0,
            ..QueryFilter::default()
        };
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.effective_limit(), DEFAULT_QUERY_FILTER_LIMIT);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let filter = QueryFilter {
            limit: 500,
            ..QueryFilter::default()
        };
        assert_eq!(filter.effective_limit(), MAX_QUERY_FILTER_LIMIT);
    }

    #[test]
    fn offset_is_previous_pages_times_limit() {
        let filter = QueryFilter {
            page: 3,
            limit: 10,
            ..QueryFilter::default()
        };
        assert_eq!(filter.offset(), 20);
    }

    #[test]
    fn huge_pages_stay_within_integer_range() {
        let filter = QueryFilter {
            page: u64::MAX,
            limit: 10,
            ..QueryFilter::default()
        };
        assert_eq!(filter.offset(), i64::MAX as u64);
        assert_eq!(filter.page(), u64::MAX);
    }

    #[test]
    fn apply_renders_bounds_order_and_window() {
        let filter = QueryFilter {
            page: 2,
            limit: 10,
            created_after: Some(150),
            created_before: Some(250),
            sort_by: SortBy::Descending,
            ..QueryFilter::default()
        };
        let mut builder = SelectBuilder::new(Dialect::Sqlite, "ingredients")
            .columns(["id"])
            .where_null("archived_on");
        filter.apply(&mut builder);
        let query = builder.to_sql().unwrap();

        assert_eq!(
            query.sql,
            "SELECT id FROM ingredients WHERE archived_on IS NULL AND created_on >= ? AND created_on <= ? ORDER BY created_on DESC, id DESC LIMIT 10 OFFSET 10"
        );
        assert_eq!(query.args.len(), 2);
    }

    #[test]
    fn predicates_only_for_counts() {
        let filter = QueryFilter {
            updated_after: Some(10),
            ..QueryFilter::default()
        };
        let mut builder = SelectBuilder::new(Dialect::Sqlite, "recipes").columns(["COUNT(id)"]);
        filter.apply_predicates(&mut builder);
        let query = builder.to_sql().unwrap();
        assert_eq!(
            query.sql,
            "SELECT COUNT(id) FROM recipes WHERE updated_on >= ?"
        );
    }

    #[test]
    fn query_pairs_are_parsed_leniently() {
        let filter = QueryFilter::from_query_pairs([
            ("page", "4"),
            ("limit", "abc"),
            ("created_after", "100"),
            ("sort_by", "DESC"),
            ("unknown", "x"),
        ]);
        assert_eq!(filter.page, 4);
        assert_eq!(filter.limit, DEFAULT_QUERY_FILTER_LIMIT);
        assert_eq!(filter.created_after, Some(100));
        assert_eq!(filter.sort_by, SortBy::Descending);
    }

    #[test]
    fn sort_by_serializes_lowercase() {
        let json = serde_json::to_string(&SortBy::Descending).unwrap();
        assert_eq!(json, "\"desc\"");
    }
}
