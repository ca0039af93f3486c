//! Shared envelope for owned records.
//!
//! # Responsibility
//! - Define the `OwnedEntity` contract consumed by the generic repository.
//! - Declare owned entities from one field list so the struct layout, the
//!   projection, the scan order and the INSERT order cannot drift apart.
//! - Provide the comma-delimited text codec for list-valued columns.
//!
//! # Invariants
//! - Projection order is `id`, payload fields, `created_on`, `updated_on`,
//!   `archived_on`, `belongs_to`.
//! - `id` and timestamps are assigned by the store, never taken from input.

use crate::query::BindValue;
use crate::repo::scan::{ColumnFault, FromColumn, ScanError, Scanner};
use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};

const LIST_DELIMITER: &str = ",";

/// Ordered list of strings persisted as one comma-joined text column.
///
/// Elements must not contain the delimiter; an empty column decodes to an
/// empty list. A list holding only `""` therefore reads back as empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DelimitedList(pub Vec<String>);

impl DelimitedList {
    pub fn encode(&self) -> String {
        self.0.join(LIST_DELIMITER)
    }

    pub fn decode(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        Self(raw.split(LIST_DELIMITER).map(str::to_string).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DelimitedList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for DelimitedList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl FromColumn for DelimitedList {
    const EXPECTED: &'static str = "comma-delimited text";

    fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault> {
        String::from_column(value).map(|raw| Self::decode(&raw))
    }
}

impl BindValue for DelimitedList {
    fn bind_value(&self) -> Value {
        Value::Text(self.encode())
    }
}

/// A record owned by exactly one user and soft-deleted through `archived_on`.
pub trait OwnedEntity: Clone + Sized {
    /// Caller-supplied payload for creation.
    type Input;

    const TABLE: &'static str;
    /// Singular name used in error context.
    const NAME: &'static str;
    /// Updatable payload columns, in INSERT order (owner excluded).
    const FIELDS: &'static [&'static str];
    /// Canonical projection.
    const COLUMNS: &'static [&'static str];

    /// Entity with zeroed id and timestamps.
    fn from_input(input: Self::Input) -> Self;
    fn scan<S: Scanner + ?Sized>(row: &S) -> Result<Self, ScanError>;
    /// Bind values for `FIELDS`, in the same order.
    fn field_values(&self) -> Vec<Value>;

    fn id(&self) -> u64;
    fn belongs_to(&self) -> u64;
    fn created_on(&self) -> u64;
    fn updated_on(&self) -> Option<u64>;
    fn archived_on(&self) -> Option<u64>;
    fn assign_identity(&mut self, id: u64, created_on: u64);

    fn is_archived(&self) -> bool {
        self.archived_on().is_some()
    }
}

/// Declares an owned entity, its creation input and its `OwnedEntity` impl.
macro_rules! owned_entity {
    (
        $(#[$meta:meta])*
        $entity:ident / $input:ident in $table:literal as $name:literal {
            $( $(#[$field_meta:meta])* $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $entity {
            pub id: u64,
            $( $(#[$field_meta])* pub $field: $ty, )+
            pub created_on: u64,
            pub updated_on: Option<u64>,
            pub archived_on: Option<u64>,
            pub belongs_to: u64,
        }

        #[doc = concat!("Creation payload for [`", stringify!($entity), "`].")]
        #[derive(Debug, Clone, PartialEq, Default, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $input {
            $( pub $field: $ty, )+
            pub belongs_to: u64,
        }

        impl $crate::model::OwnedEntity for $entity {
            type Input = $input;

            const TABLE: &'static str = $table;
            const NAME: &'static str = $name;
            const FIELDS: &'static [&'static str] = &[$( stringify!($field) ),+];
            const COLUMNS: &'static [&'static str] = &[
                "id",
                $( stringify!($field), )+
                "created_on",
                "updated_on",
                "archived_on",
                "belongs_to",
            ];

            fn from_input(input: $input) -> Self {
                Self {
                    id: 0,
                    $( $field: input.$field, )+
                    created_on: 0,
                    updated_on: None,
                    archived_on: None,
                    belongs_to: input.belongs_to,
                }
            }

            fn scan<S: $crate::repo::scan::Scanner + ?Sized>(
                row: &S,
            ) -> Result<Self, $crate::repo::scan::ScanError> {
                let mut cursor =
                    $crate::repo::scan::ColumnCursor::new(row, Self::TABLE, Self::COLUMNS)?;
                Ok(Self {
                    id: cursor.read()?,
                    $( $field: cursor.read()?, )+
                    created_on: cursor.read()?,
                    updated_on: cursor.read()?,
                    archived_on: cursor.read()?,
                    belongs_to: cursor.read()?,
                })
            }

            fn field_values(&self) -> Vec<::rusqlite::types::Value> {
                vec![$( $crate::query::BindValue::bind_value(&self.$field) ),+]
            }

            fn id(&self) -> u64 {
                self.id
            }

            fn belongs_to(&self) -> u64 {
                self.belongs_to
            }

            fn created_on(&self) -> u64 {
                self.created_on
            }

            fn updated_on(&self) -> Option<u64> {
                self.updated_on
            }

            fn archived_on(&self) -> Option<u64> {
                self.archived_on
            }

            fn assign_identity(&mut self, id: u64, created_on: u64) {
                self.id = id;
                self.created_on = created_on;
            }
        }
    };
}

pub(crate) use owned_entity;

#[cfg(test)]
mod tests {
    use super::DelimitedList;

    #[test]
    fn empty_list_encodes_to_empty_text() {
        assert_eq!(DelimitedList::default().encode(), "");
        assert!(DelimitedList::decode("").is_empty());
    }

    #[test]
    fn lone_empty_element_reads_back_as_empty_list() {
        let list: DelimitedList = [""].into_iter().collect();
        assert_eq!(list.encode(), "");
        assert!(DelimitedList::decode(&list.encode()).is_empty());

        let padded: DelimitedList = ["", "a"].into_iter().collect();
        assert_eq!(DelimitedList::decode(&padded.encode()), padded);
    }

    #[test]
    fn text_without_delimiter_is_one_element() {
        let list = DelimitedList::decode("read");
        assert_eq!(list.0, vec!["read".to_string()]);
    }

    #[test]
    fn order_survives_encode_and_decode() {
        let list: DelimitedList = ["webhook_created", "item_archived", "a b"]
            .into_iter()
            .collect();
        let encoded = list.encode();
        assert_eq!(encoded, "webhook_created,item_archived,a b");
        assert_eq!(DelimitedList::decode(&encoded), list);
    }

    #[test]
    fn serializes_as_plain_array() {
        let list: DelimitedList = ["a", "b"].into_iter().collect();
        assert_eq!(serde_json::to_string(&list).unwrap(), "[\"a\",\"b\"]");
    }
}
