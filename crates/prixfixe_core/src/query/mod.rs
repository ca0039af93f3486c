//! Dialect-aware SQL composition.
//!
//! # Responsibility
//! - Render SELECT / INSERT / UPDATE statements with positional placeholders
//!   and a parallel argument list.
//! - Be the only place in the crate where statement text is assembled.
//!
//! # Invariants
//! - `args.len()` always equals the number of placeholders in `sql`.
//! - Equality predicates render in lexicographic column order, so two builds
//!   of the same logical query are byte-identical.
//! - `Value::Null` equality renders as `IS NULL` and binds nothing.
//! - Identifiers are validated before rendering; keywords are double-quoted.

pub mod filter;

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use filter::{EntityList, Pagination, QueryFilter, SortBy};

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));
static COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^COUNT\(([A-Za-z_][A-Za-z0-9_]*)\)$").expect("valid count projection regex")
});

/// Column names that collide with SQL keywords and must be quoted.
const QUOTED_KEYWORDS: &[&str] = &[
    "check", "default", "from", "group", "index", "key", "limit", "offset", "order", "select",
    "table", "values", "where",
];

/// Placeholder flavor of the target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?` placeholders, `strftime` clock.
    #[default]
    Sqlite,
    /// `$1, $2, ...` placeholders, `extract(epoch ...)` clock.
    Postgres,
}

impl Dialect {
    fn placeholder(self, position: usize) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${position}"),
        }
    }

    /// Store expression for "now as unix seconds".
    pub fn now_expr(self) -> &'static str {
        match self {
            Self::Sqlite => "(strftime('%s','now'))",
            Self::Postgres => "extract(epoch FROM NOW())",
        }
    }
}

/// Rendered statement plus its bind values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Builder misuse. Always a programming error, never a runtime condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    InvalidIdentifier(String),
    EmptyProjection { table: String },
    EmptyValues { table: String },
    MismatchedValues {
        table: String,
        columns: usize,
        values: usize,
    },
    EmptyAssignments { table: String },
    EmptyInList { column: String },
}

impl Display for QueryBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "invalid SQL identifier `{value}`"),
            Self::EmptyProjection { table } => write!(f, "select from `{table}` has no columns"),
            Self::EmptyValues { table } => write!(f, "insert into `{table}` has no values"),
            Self::MismatchedValues {
                table,
                columns,
                values,
            } => write!(
                f,
                "insert into `{table}` has {columns} column(s) but {values} value(s)"
            ),
            Self::EmptyAssignments { table } => write!(f, "update of `{table}` sets nothing"),
            Self::EmptyInList { column } => write!(f, "IN predicate on `{column}` is empty"),
        }
    }
}

impl Error for QueryBuildError {}

pub type BuildResult<T> = Result<T, QueryBuildError>;

/// Range comparison for non-equality predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl Comparison {
    fn operator(self) -> &'static str {
        match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Less => "<",
            Self::LessOrEqual => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Compare {
        column: String,
        comparison: Comparison,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
}

/// Accumulates bind values and hands out matching placeholders.
struct ArgWriter {
    dialect: Dialect,
    args: Vec<Value>,
}

impl ArgWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            args: Vec::new(),
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.args.push(value);
        self.dialect.placeholder(self.args.len())
    }

    fn finish(self, sql: String) -> Query {
        Query {
            sql,
            args: self.args,
        }
    }
}

fn ident(name: &str) -> BuildResult<String> {
    if !IDENT_RE.is_match(name) {
        return Err(QueryBuildError::InvalidIdentifier(name.to_string()));
    }
    if QUOTED_KEYWORDS.contains(&name.to_ascii_lowercase().as_str()) {
        return Ok(format!("\"{name}\""));
    }
    Ok(name.to_string())
}

fn projection(name: &str) -> BuildResult<String> {
    if let Some(captures) = COUNT_RE.captures(name) {
        let inner = captures.get(1).map_or("", |value| value.as_str());
        return Ok(format!("COUNT({})", ident(inner)?));
    }
    ident(name)
}

fn render_where(
    eq: &BTreeMap<String, Value>,
    predicates: &[Predicate],
    writer: &mut ArgWriter,
) -> BuildResult<String> {
    let mut clauses = Vec::with_capacity(eq.len() + predicates.len());
    for (column, value) in eq {
        let column = ident(column)?;
        if matches!(value, Value::Null) {
            clauses.push(format!("{column} IS NULL"));
        } else {
            let placeholder = writer.bind(value.clone());
            clauses.push(format!("{column} = {placeholder}"));
        }
    }

    for predicate in predicates {
        match predicate {
            Predicate::Compare {
                column,
                comparison,
                value,
            } => {
                let column = ident(column)?;
                let placeholder = writer.bind(value.clone());
                clauses.push(format!("{column} {} {placeholder}", comparison.operator()));
            }
            Predicate::In { column, values } => {
                if values.is_empty() {
                    return Err(QueryBuildError::EmptyInList {
                        column: column.clone(),
                    });
                }
                let column = ident(column)?;
                let placeholders = values
                    .iter()
                    .map(|value| writer.bind(value.clone()))
                    .collect::<Vec<_>>()
                    .join(",");
                clauses.push(format!("{column} IN ({placeholders})"));
            }
        }
    }

    if clauses.is_empty() {
        return Ok(String::new());
    }
    Ok(format!(" WHERE {}", clauses.join(" AND ")))
}

/// SELECT statement builder.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBuilder {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    eq: BTreeMap<String, Value>,
    predicates: Vec<Predicate>,
    order_by: Vec<(String, SortBy)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            columns: Vec::new(),
            eq: BTreeMap::new(),
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns
            .extend(columns.into_iter().map(|column| column.as_ref().to_string()));
        self
    }

    /// Adds `column = value` (or `column IS NULL` for `Value::Null`).
    pub fn where_eq(mut self, column: &str, value: Value) -> Self {
        self.eq.insert(column.to_string(), value);
        self
    }

    pub fn where_null(self, column: &str) -> Self {
        self.where_eq(column, Value::Null)
    }

    pub fn where_cmp(&mut self, column: &str, comparison: Comparison, value: Value) {
        self.predicates.push(Predicate::Compare {
            column: column.to_string(),
            comparison,
            value,
        });
    }

    pub fn where_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.predicates.push(Predicate::In {
            column: column.to_string(),
            values,
        });
        self
    }

    pub fn order_by(&mut self, column: &str, direction: SortBy) {
        self.order_by.push((column.to_string(), direction));
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    pub fn to_sql(&self) -> BuildResult<Query> {
        let mut writer = ArgWriter::new(self.dialect);
        let sql = self.render(&mut writer)?;
        Ok(writer.finish(sql))
    }

    /// Renders `SELECT EXISTS ( <select> )`.
    pub fn to_exists_sql(&self) -> BuildResult<Query> {
        let mut writer = ArgWriter::new(self.dialect);
        let inner = self.render(&mut writer)?;
        Ok(writer.finish(format!("SELECT EXISTS ( {inner} )")))
    }

    fn render(&self, writer: &mut ArgWriter) -> BuildResult<String> {
        if self.columns.is_empty() {
            return Err(QueryBuildError::EmptyProjection {
                table: self.table.clone(),
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|column| projection(column))
            .collect::<BuildResult<Vec<_>>>()?;

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), ident(&self.table)?);
        sql.push_str(&render_where(&self.eq, &self.predicates, writer)?);

        if !self.order_by.is_empty() {
            let terms = self
                .order_by
                .iter()
                .map(|(column, direction)| Ok(format!("{} {}", ident(column)?, direction.as_sql())))
                .collect::<BuildResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset.filter(|offset| *offset > 0) {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok(sql)
    }
}

/// INSERT statement builder.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBuilder {
    dialect: Dialect,
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl InsertBuilder {
    pub fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns
            .extend(columns.into_iter().map(|column| column.as_ref().to_string()));
        self
    }

    pub fn values(mut self, values: Vec<Value>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn to_sql(&self) -> BuildResult<Query> {
        if self.values.is_empty() {
            return Err(QueryBuildError::EmptyValues {
                table: self.table.clone(),
            });
        }
        if self.columns.len() != self.values.len() {
            return Err(QueryBuildError::MismatchedValues {
                table: self.table.clone(),
                columns: self.columns.len(),
                values: self.values.len(),
            });
        }

        let columns = self
            .columns
            .iter()
            .map(|column| ident(column))
            .collect::<BuildResult<Vec<_>>>()?;
        let mut writer = ArgWriter::new(self.dialect);
        let placeholders = self
            .values
            .iter()
            .map(|value| writer.bind(value.clone()))
            .collect::<Vec<_>>();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            ident(&self.table)?,
            columns.join(","),
            placeholders.join(",")
        );
        Ok(writer.finish(sql))
    }
}

/// Right-hand side of an UPDATE assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Bind(Value),
    /// The store's current unix time.
    Now,
}

/// UPDATE statement builder.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBuilder {
    dialect: Dialect,
    table: String,
    assignments: Vec<(String, SetValue)>,
    eq: BTreeMap<String, Value>,
}

impl UpdateBuilder {
    pub fn new(dialect: Dialect, table: &str) -> Self {
        Self {
            dialect,
            table: table.to_string(),
            assignments: Vec::new(),
            eq: BTreeMap::new(),
        }
    }

    pub fn set(mut self, column: &str, value: Value) -> Self {
        self.assignments
            .push((column.to_string(), SetValue::Bind(value)));
        self
    }

    pub fn set_now(mut self, column: &str) -> Self {
        self.assignments.push((column.to_string(), SetValue::Now));
        self
    }

    pub fn where_eq(mut self, column: &str, value: Value) -> Self {
        self.eq.insert(column.to_string(), value);
        self
    }

    pub fn where_null(self, column: &str) -> Self {
        self.where_eq(column, Value::Null)
    }

    pub fn to_sql(&self) -> BuildResult<Query> {
        if self.assignments.is_empty() {
            return Err(QueryBuildError::EmptyAssignments {
                table: self.table.clone(),
            });
        }

        let mut writer = ArgWriter::new(self.dialect);
        let mut assignments = Vec::with_capacity(self.assignments.len());
        for (column, value) in &self.assignments {
            let column = ident(column)?;
            let rhs = match value {
                SetValue::Bind(value) => writer.bind(value.clone()),
                SetValue::Now => self.dialect.now_expr().to_string(),
            };
            assignments.push(format!("{column} = {rhs}"));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            ident(&self.table)?,
            assignments.join(", ")
        );
        sql.push_str(&render_where(&self.eq, &[], &mut writer)?);
        Ok(writer.finish(sql))
    }
}

/// Converts an id or unix timestamp to a bind value.
///
/// Values above `i64::MAX` cannot name a stored row; they bind as text so
/// that they match nothing instead of wrapping around.
pub fn u64_value(value: u64) -> Value {
    match i64::try_from(value) {
        Ok(value) => Value::Integer(value),
        Err(_) => Value::Text(value.to_string()),
    }
}

/// Conversion of a domain value into a bind value.
pub trait BindValue {
    fn bind_value(&self) -> Value;
}

impl BindValue for String {
    fn bind_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl BindValue for bool {
    fn bind_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl BindValue for u16 {
    fn bind_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl BindValue for u32 {
    fn bind_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl BindValue for u64 {
    fn bind_value(&self) -> Value {
        u64_value(*self)
    }
}

impl BindValue for f32 {
    fn bind_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }
}

impl<T: BindValue> BindValue for Option<T> {
    fn bind_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, BindValue::bind_value)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        u64_value, Comparison, Dialect, InsertBuilder, QueryBuildError, SelectBuilder, SortBy,
        UpdateBuilder,
    };
    use rusqlite::types::Value;

    fn placeholder_count(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn get_query_orders_equalities_by_column_name() {
        let query = SelectBuilder::new(Dialect::Sqlite, "instruments")
            .columns(["id", "name", "belongs_to"])
            .where_eq("id", u64_value(123))
            .where_eq("belongs_to", u64_value(321))
            .to_sql()
            .unwrap();

        assert_eq!(
            query.sql,
            "SELECT id, name, belongs_to FROM instruments WHERE belongs_to = ? AND id = ?"
        );
        assert_eq!(query.args, vec![Value::Integer(321), Value::Integer(123)]);
    }

    #[test]
    fn null_equality_renders_is_null_without_binding() {
        let query = SelectBuilder::new(Dialect::Sqlite, "instruments")
            .columns(["COUNT(id)"])
            .where_eq("belongs_to", u64_value(321))
            .where_null("archived_on")
            .to_sql()
            .unwrap();

        assert_eq!(
            query.sql,
            "SELECT COUNT(id) FROM instruments WHERE archived_on IS NULL AND belongs_to = ?"
        );
        assert_eq!(query.args.len(), placeholder_count(&query.sql));
    }

    #[test]
    fn repeated_builds_are_byte_identical() {
        let build = || {
            UpdateBuilder::new(Dialect::Sqlite, "recipes")
                .set_now("updated_on")
                .set_now("archived_on")
                .where_eq("id", u64_value(9))
                .where_null("archived_on")
                .where_eq("belongs_to", u64_value(4))
                .to_sql()
                .unwrap()
        };
        assert_eq!(build(), build());
        assert_eq!(
            build().sql,
            "UPDATE recipes SET updated_on = (strftime('%s','now')), archived_on = (strftime('%s','now')) WHERE archived_on IS NULL AND belongs_to = ? AND id = ?"
        );
    }

    #[test]
    fn insert_uses_compact_column_and_value_lists() {
        let query = InsertBuilder::new(Dialect::Sqlite, "instruments")
            .columns(["name", "variant", "description", "icon", "belongs_to"])
            .values(vec![
                Value::Text("knife".to_string()),
                Value::Text(String::new()),
                Value::Text(String::new()),
                Value::Text(String::new()),
                u64_value(321),
            ])
            .to_sql()
            .unwrap();

        assert_eq!(
            query.sql,
            "INSERT INTO instruments (name,variant,description,icon,belongs_to) VALUES (?,?,?,?,?)"
        );
        assert_eq!(query.args.len(), 5);
    }

    #[test]
    fn insert_with_mismatched_values_fails() {
        let err = InsertBuilder::new(Dialect::Sqlite, "reports")
            .columns(["report_type", "concern"])
            .values(vec![Value::Text("spam".to_string())])
            .to_sql()
            .unwrap_err();
        assert_eq!(
            err,
            QueryBuildError::MismatchedValues {
                table: "reports".to_string(),
                columns: 2,
                values: 1,
            }
        );
    }

    #[test]
    fn keyword_columns_are_quoted() {
        let query = SelectBuilder::new(Dialect::Sqlite, "recipe_steps")
            .columns(["id", "index"])
            .where_eq("id", u64_value(1))
            .to_sql()
            .unwrap();
        assert_eq!(query.sql, "SELECT id, \"index\" FROM recipe_steps WHERE id = ?");
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let err = SelectBuilder::new(Dialect::Sqlite, "users; DROP TABLE users")
            .columns(["id"])
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::InvalidIdentifier(_)));
    }

    #[test]
    fn range_and_in_predicates_follow_equalities() {
        let mut builder = SelectBuilder::new(Dialect::Sqlite, "webhooks")
            .columns(["id"])
            .where_in("id", vec![u64_value(1), u64_value(2), u64_value(3)])
            .where_eq("belongs_to", u64_value(5));
        builder.where_cmp("created_on", Comparison::GreaterOrEqual, u64_value(100));
        builder.order_by("created_on", SortBy::Descending);
        builder.set_limit(20);
        builder.set_offset(40);

        let query = builder.to_sql().unwrap();
        assert_eq!(
            query.sql,
            "SELECT id FROM webhooks WHERE belongs_to = ? AND id IN (?,?,?) AND created_on >= ? ORDER BY created_on DESC LIMIT 20 OFFSET 40"
        );
        assert_eq!(query.args.len(), placeholder_count(&query.sql));
        assert_eq!(query.args[0], Value::Integer(5));
    }

    #[test]
    fn empty_in_list_is_a_build_error() {
        let err = SelectBuilder::new(Dialect::Sqlite, "webhooks")
            .columns(["id"])
            .where_in("id", Vec::new())
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::EmptyInList { .. }));
    }

    #[test]
    fn postgres_dialect_numbers_placeholders() {
        let query = UpdateBuilder::new(Dialect::Postgres, "instruments")
            .set("name", Value::Text("whisk".to_string()))
            .set_now("updated_on")
            .where_eq("id", u64_value(2))
            .where_eq("belongs_to", u64_value(1))
            .to_sql()
            .unwrap();
        assert_eq!(
            query.sql,
            "UPDATE instruments SET name = $1, updated_on = extract(epoch FROM NOW()) WHERE belongs_to = $2 AND id = $3"
        );
    }

    #[test]
    fn exists_wraps_the_select() {
        let query = SelectBuilder::new(Dialect::Sqlite, "recipes")
            .columns(["id"])
            .where_null("archived_on")
            .where_eq("belongs_to", u64_value(1))
            .where_eq("id", u64_value(2))
            .to_exists_sql()
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT EXISTS ( SELECT id FROM recipes WHERE archived_on IS NULL AND belongs_to = ? AND id = ? )"
        );
    }

    #[test]
    fn oversized_ids_bind_as_text() {
        assert_eq!(u64_value(7), Value::Integer(7));
        assert_eq!(
            u64_value(u64::MAX),
            Value::Text(u64::MAX.to_string())
        );
    }
}
