//! Row scanning contract shared by every repository.
//!
//! # Responsibility
//! - Abstract "a row with named, typed columns" behind [`Scanner`] so entity
//!   decoders run against live rusqlite rows and in-memory mock rows alike.
//! - Decode columns strictly in projection order.
//!
//! # Invariants
//! - A row whose column names differ from the projection (count, name or
//!   order) fails with `ScanError::ColumnMismatch` before any value is read.
//! - Type mismatches are errors; nothing is coerced silently.

use super::{RepoError, RepoResult};
use crate::query::Query;
use log::warn;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, Row, Statement};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Source of one result row.
pub trait Scanner {
    fn column_count(&self) -> usize;
    fn column_name(&self, index: usize) -> Option<&str>;
    fn value(&self, index: usize) -> rusqlite::Result<ValueRef<'_>>;
}

impl Scanner for Row<'_> {
    fn column_count(&self) -> usize {
        let stmt: &Statement<'_> = self.as_ref();
        stmt.column_count()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        let stmt: &Statement<'_> = self.as_ref();
        stmt.column_name(index).ok()
    }

    fn value(&self, index: usize) -> rusqlite::Result<ValueRef<'_>> {
        self.get_ref(index)
    }
}

#[derive(Debug)]
pub enum ScanError {
    /// Row shape differs from the projection at `position`.
    ColumnMismatch {
        table: &'static str,
        position: usize,
        expected: Option<&'static str>,
        found: Option<String>,
    },
    UnexpectedNull {
        table: &'static str,
        column: &'static str,
    },
    Conversion {
        table: &'static str,
        column: &'static str,
        expected: &'static str,
        found: String,
    },
    Sqlite(rusqlite::Error),
}

impl Display for ScanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnMismatch {
                table,
                position,
                expected,
                found,
            } => write!(
                f,
                "{table}: column {position} expected `{}`, found `{}`",
                expected.unwrap_or("<none>"),
                found.as_deref().unwrap_or("<none>")
            ),
            Self::UnexpectedNull { table, column } => {
                write!(f, "{table}.{column}: unexpected NULL")
            }
            Self::Conversion {
                table,
                column,
                expected,
                found,
            } => write!(f, "{table}.{column}: expected {expected}, found {found}"),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ScanError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Why a single column value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFault {
    Null,
    Type,
}

/// Strict decoding of one column value.
pub trait FromColumn: Sized {
    /// Human-readable name of the accepted storage shape.
    const EXPECTED: &'static str;

    fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault>;
}

impl<T: FromColumn> FromColumn for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault> {
        match value {
            ValueRef::Null => Ok(None),
            other => T::from_column(other).map(Some),
        }
    }
}

impl FromColumn for String {
    const EXPECTED: &'static str = "text";

    fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault> {
        match value {
            ValueRef::Null => Err(ColumnFault::Null),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|_| ColumnFault::Type),
            _ => Err(ColumnFault::Type),
        }
    }
}

impl FromColumn for bool {
    const EXPECTED: &'static str = "boolean (0 or 1)";

    fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault> {
        match value {
            ValueRef::Null => Err(ColumnFault::Null),
            ValueRef::Integer(0) => Ok(false),
            ValueRef::Integer(1) => Ok(true),
            _ => Err(ColumnFault::Type),
        }
    }
}

macro_rules! unsigned_from_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromColumn for $ty {
                const EXPECTED: &'static str = concat!("integer (", stringify!($ty), ")");

                fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault> {
                    match value {
                        ValueRef::Null => Err(ColumnFault::Null),
                        ValueRef::Integer(raw) => {
                            <$ty>::try_from(raw).map_err(|_| ColumnFault::Type)
                        }
                        _ => Err(ColumnFault::Type),
                    }
                }
            }
        )+
    };
}

unsigned_from_column!(u16, u32, u64);

impl FromColumn for f32 {
    const EXPECTED: &'static str = "real";

    fn from_column(value: ValueRef<'_>) -> Result<Self, ColumnFault> {
        match value {
            ValueRef::Null => Err(ColumnFault::Null),
            ValueRef::Real(raw) => Ok(raw as f32),
            ValueRef::Integer(raw) => Ok(raw as f32),
            _ => Err(ColumnFault::Type),
        }
    }
}

/// Reads columns of one row in projection order.
pub struct ColumnCursor<'row, S: Scanner + ?Sized> {
    row: &'row S,
    table: &'static str,
    columns: &'static [&'static str],
    position: usize,
}

impl<'row, S: Scanner + ?Sized> ColumnCursor<'row, S> {
    /// Verifies the row shape against `columns` and positions at column 0.
    pub fn new(
        row: &'row S,
        table: &'static str,
        columns: &'static [&'static str],
    ) -> Result<Self, ScanError> {
        let width = row.column_count().max(columns.len());
        for position in 0..width {
            let expected = columns.get(position).copied();
            let found = row.column_name(position);
            if expected.is_none() || expected != found {
                return Err(ScanError::ColumnMismatch {
                    table,
                    position,
                    expected,
                    found: found.map(str::to_string),
                });
            }
        }

        Ok(Self {
            row,
            table,
            columns,
            position: 0,
        })
    }

    /// Decodes the next column.
    pub fn read<T: FromColumn>(&mut self) -> Result<T, ScanError> {
        let position = self.position;
        let column = self
            .columns
            .get(position)
            .copied()
            .ok_or(ScanError::ColumnMismatch {
                table: self.table,
                position,
                expected: None,
                found: None,
            })?;
        self.position += 1;

        let value = self.row.value(position)?;
        T::from_column(value).map_err(|fault| match fault {
            ColumnFault::Null => ScanError::UnexpectedNull {
                table: self.table,
                column,
            },
            ColumnFault::Type => ScanError::Conversion {
                table: self.table,
                column,
                expected: T::EXPECTED,
                found: value.data_type().to_string(),
            },
        })
    }
}

/// Runs `query` and decodes every row with `scan_one`.
///
/// The statement is finalized on every exit path; finalize failures are
/// logged and never returned.
pub(crate) fn scan_many<T, F>(
    conn: &Connection,
    query: &Query,
    table: &'static str,
    scan_one: F,
) -> RepoResult<Vec<T>>
where
    F: Fn(&Row<'_>) -> Result<T, ScanError>,
{
    let mut stmt = conn
        .prepare(&query.sql)
        .map_err(|err| RepoError::query(format!("querying database for {table}"), err))?;
    let outcome = drain_rows(&mut stmt, query, table, &scan_one);
    if let Err(err) = stmt.finalize() {
        warn!(
            "event=rows_close module=repo status=error table={table} error_code=rows_close_failed error={err}"
        );
    }
    outcome
}

fn drain_rows<T, F>(
    stmt: &mut Statement<'_>,
    query: &Query,
    table: &'static str,
    scan_one: &F,
) -> RepoResult<Vec<T>>
where
    F: Fn(&Row<'_>) -> Result<T, ScanError>,
{
    let context = || format!("querying database for {table}");
    let mut rows = stmt
        .query(params_from_iter(query.args.iter()))
        .map_err(|err| RepoError::query(context(), err))?;

    let mut items = Vec::new();
    while let Some(row) = rows.next().map_err(|err| RepoError::query(context(), err))? {
        items.push(scan_one(row)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::{ColumnCursor, ColumnFault, FromColumn, ScanError};
    use crate::testing::MockRow;
    use rusqlite::types::{Value, ValueRef};

    const COLUMNS: &[&str] = &["id", "name", "archived_on"];

    #[test]
    fn cursor_reads_in_projection_order() {
        let row = MockRow::new(vec![
            ("id", Value::Integer(4)),
            ("name", Value::Text("whisk".to_string())),
            ("archived_on", Value::Null),
        ]);
        let mut cursor = ColumnCursor::new(&row, "instruments", COLUMNS).unwrap();
        assert_eq!(cursor.read::<u64>().unwrap(), 4);
        assert_eq!(cursor.read::<String>().unwrap(), "whisk");
        assert_eq!(cursor.read::<Option<u64>>().unwrap(), None);
    }

    #[test]
    fn permuted_columns_are_rejected_up_front() {
        let row = MockRow::new(vec![
            ("name", Value::Text("whisk".to_string())),
            ("id", Value::Integer(4)),
            ("archived_on", Value::Null),
        ]);
        let err = ColumnCursor::new(&row, "instruments", COLUMNS).err().unwrap();
        assert!(matches!(
            err,
            ScanError::ColumnMismatch { position: 0, .. }
        ));
    }

    #[test]
    fn short_rows_are_rejected() {
        let row = MockRow::new(vec![("id", Value::Integer(4))]);
        let err = ColumnCursor::new(&row, "instruments", COLUMNS).err().unwrap();
        assert!(matches!(
            err,
            ScanError::ColumnMismatch {
                position: 1,
                found: None,
                ..
            }
        ));
    }

    #[test]
    fn null_in_required_column_is_reported() {
        let row = MockRow::new(vec![
            ("id", Value::Integer(4)),
            ("name", Value::Null),
            ("archived_on", Value::Null),
        ]);
        let mut cursor = ColumnCursor::new(&row, "instruments", COLUMNS).unwrap();
        cursor.read::<u64>().unwrap();
        let err = cursor.read::<String>().unwrap_err();
        assert!(matches!(
            err,
            ScanError::UnexpectedNull {
                column: "name",
                ..
            }
        ));
    }

    #[test]
    fn booleans_accept_only_zero_and_one() {
        assert_eq!(bool::from_column(ValueRef::Integer(1)), Ok(true));
        assert_eq!(bool::from_column(ValueRef::Integer(0)), Ok(false));
        assert_eq!(
            bool::from_column(ValueRef::Integer(2)),
            Err(ColumnFault::Type)
        );
    }

    #[test]
    fn negative_integers_do_not_decode_as_unsigned() {
        assert_eq!(
            u64::from_column(ValueRef::Integer(-1)),
            Err(ColumnFault::Type)
        );
        assert_eq!(
            u32::from_column(ValueRef::Text(b"12")),
            Err(ColumnFault::Type)
        );
    }
}
