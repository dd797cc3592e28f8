//! Relational data types projected onto the key-value namespace.

use std::fmt;

use common::UNBOUNDED_REVISION;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Text,
    /// 64-bit signed integer. Persisted under the `INT32` tag for
    /// compatibility with existing table metadata.
    Int64,
    /// Milliseconds since the Unix epoch.
    Timestamp,
}

impl ColumnType {
    /// The tag written into table metadata.
    pub fn tag(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Int64 => "INT32",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// Parses a metadata tag.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "TEXT" => Ok(ColumnType::Text),
            "INT32" => Ok(ColumnType::Int64),
            "TIMESTAMP" => Ok(ColumnType::Timestamp),
            other => Err(Error::UnsupportedType(other.to_string())),
        }
    }

    /// Returns true if `value` can be stored in a column of this type.
    /// `Null` is accepted by every type.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Int64, Value::Int64(_))
                | (ColumnType::Timestamp, Value::Timestamp(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    /// Name of the table the column belongs to.
    pub source: String,
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            source: String::new(),
            primary_key: false,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Marks the column as the table's primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// Ordered list of columns describing a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the position of the primary-key column.
    ///
    /// Fails with [`Error::MissingPrimaryKey`] unless exactly one column is
    /// marked as primary key.
    pub fn primary_key_index(&self) -> Result<usize> {
        let mut keys = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i);
        match (keys.next(), keys.next()) {
            (Some(index), None) => Ok(index),
            (None, _) => Err(Error::MissingPrimaryKey(
                "schema has no primary key column".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::MissingPrimaryKey(
                "schema has more than one primary key column".to_string(),
            )),
        }
    }
}

impl From<Vec<Column>> for Schema {
    fn from(columns: Vec<Column>) -> Self {
        Self::new(columns)
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int64(i64),
    Text(String),
    Timestamp(i64),
}

impl Value {
    /// Returns the value as a primary key. Only integers qualify.
    pub fn as_primary_key(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int64(_) => "INT64",
            Value::Text(_) => "TEXT",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

/// Column values positioned in schema order.
pub type Row = Vec<Value>;

/// Identifier of a write batch in the underlying store.
///
/// [`Revision::LATEST`] (zero) always refers to the most recent state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(u64);

impl Revision {
    pub const LATEST: Revision = Revision(0);

    pub fn new(revision: u64) -> Self {
        Self(revision)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_latest(self) -> bool {
        self == Self::LATEST
    }

    /// The revision bound to hand to the store. Stores read a bound of zero
    /// as "before the first write", so latest maps to the unbounded sentinel.
    pub(crate) fn as_bound(self) -> u64 {
        if self.is_latest() {
            UNBOUNDED_REVISION
        } else {
            self.0
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_latest() {
            f.write_str("latest")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int64).primary_key(),
            Column::new("name", ColumnType::Text),
        ])
    }

    #[test]
    fn should_find_single_primary_key() {
        assert_eq!(users_schema().primary_key_index().unwrap(), 0);
    }

    #[test]
    fn should_reject_schema_without_primary_key() {
        // given
        let schema = Schema::new(vec![Column::new("name", ColumnType::Text)]);

        // when
        let result = schema.primary_key_index();

        // then
        assert!(matches!(result, Err(Error::MissingPrimaryKey(_))));
    }

    #[test]
    fn should_reject_schema_with_two_primary_keys() {
        // given
        let schema = Schema::new(vec![
            Column::new("a", ColumnType::Int64).primary_key(),
            Column::new("b", ColumnType::Int64).primary_key(),
        ]);

        // when
        let result = schema.primary_key_index();

        // then
        assert!(matches!(result, Err(Error::MissingPrimaryKey(_))));
    }

    #[test]
    fn should_parse_known_tags() {
        assert_eq!(ColumnType::from_tag("TEXT").unwrap(), ColumnType::Text);
        assert_eq!(ColumnType::from_tag("INT32").unwrap(), ColumnType::Int64);
        assert_eq!(
            ColumnType::from_tag("TIMESTAMP").unwrap(),
            ColumnType::Timestamp
        );
        assert_eq!(
            ColumnType::from_tag("BLOB"),
            Err(Error::UnsupportedType("BLOB".to_string()))
        );
    }

    #[test]
    fn should_only_accept_integers_as_primary_keys() {
        assert_eq!(Value::Int64(-3).as_primary_key(), Some(-3));
        assert_eq!(Value::Text("3".into()).as_primary_key(), None);
        assert_eq!(Value::Timestamp(3).as_primary_key(), None);
        assert_eq!(Value::Null.as_primary_key(), None);
    }

    #[test]
    fn should_map_latest_revision_to_unbounded_bound() {
        assert_eq!(Revision::LATEST.as_bound(), UNBOUNDED_REVISION);
        assert_eq!(Revision::new(5).as_bound(), 5);
    }
}
