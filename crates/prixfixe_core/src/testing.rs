//! In-memory rows for exercising scanners without a database.
//!
//! Compiled for this crate's tests and for downstream crates that enable the
//! `test-support` feature.

use crate::model::OwnedEntity;
use crate::query::u64_value;
use crate::repo::scan::Scanner;
use rusqlite::types::{Value, ValueRef};

/// A single result row with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRow {
    columns: Vec<(String, Value)>,
}

impl MockRow {
    pub fn new<S: Into<String>>(columns: Vec<(S, Value)>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    /// Row holding `entity` in its canonical projection order.
    pub fn from_entity<E: OwnedEntity>(entity: &E) -> Self {
        let mut values = vec![u64_value(entity.id())];
        values.extend(entity.field_values());
        values.push(u64_value(entity.created_on()));
        values.push(entity.updated_on().map_or(Value::Null, u64_value));
        values.push(entity.archived_on().map_or(Value::Null, u64_value));
        values.push(u64_value(entity.belongs_to()));

        Self::new(E::COLUMNS.iter().copied().zip(values).collect())
    }

    /// Same row with columns `a` and `b` exchanged, names and values alike.
    pub fn swapped(mut self, a: usize, b: usize) -> Self {
        self.columns.swap(a, b);
        self
    }

    /// Same row with the value at `index` replaced, name kept.
    pub fn with_value(mut self, index: usize, value: Value) -> Self {
        if let Some(column) = self.columns.get_mut(index) {
            column.1 = value;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Scanner for MockRow {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|(name, _)| name.as_str())
    }

    fn value(&self, index: usize) -> rusqlite::Result<ValueRef<'_>> {
        self.columns
            .get(index)
            .map(|(_, value)| ValueRef::from(value))
            .ok_or(rusqlite::Error::InvalidColumnIndex(index))
    }
}
