use std::collections::BTreeMap;

use time::OffsetDateTime;
use uuid::Uuid;

/// A single value handed to a query template.
///
/// `Ident` values are trusted identifiers (sort columns, directions) that the
/// renderer may splice into SQL text; every other kind is only ever bound as a
/// positional argument.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(OffsetDateTime),
    Ident(String),
}

impl SqlValue {
    pub fn ident(value: impl Into<String>) -> Self {
        Self::Ident(value.into())
    }

    /// Truthiness used by `{{if key}}` directives.
    pub fn is_truthy(&self) -> bool {
        match self {
            SqlValue::Null => false,
            SqlValue::Bool(value) => *value,
            SqlValue::Int(value) => *value != 0,
            SqlValue::BigInt(value) => *value != 0,
            SqlValue::Text(value) | SqlValue::Ident(value) => !value.is_empty(),
            SqlValue::Uuid(_) | SqlValue::Timestamp(_) => true,
        }
    }

    pub fn is_ident(&self) -> bool {
        matches!(self, SqlValue::Ident(_))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<Uuid> for SqlValue {
    fn from(value: Uuid) -> Self {
        SqlValue::Uuid(value)
    }
}

impl From<OffsetDateTime> for SqlValue {
    fn from(value: OffsetDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

/// Named values for one template render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: BTreeMap<String, SqlValue>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SqlValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SqlValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
