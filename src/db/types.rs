//! Query result types for duck-console.
//!
//! Defines the structures used to represent query results from the database.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Column names and materialized rows of one executed statement.
///
/// Rows are stored positionally so duplicate column names (`SELECT 1 AS a, 2 AS a`)
/// stay distinct; [`QueryResult::records`] gives the name-to-value view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names in result order. Empty for statements without a result set.
    pub columns: Vec<String>,

    /// Rows of data, each exactly `columns.len()` wide.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of materialized rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if every row has exactly one value per column.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|row| row.len() == self.columns.len())
    }

    /// Returns the row at `index` zipped with the column names.
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|row| Record {
            fields: self
                .columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect(),
        })
    }

    /// Iterates over all rows as column-name to value mappings.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        (0..self.rows.len()).filter_map(move |index| self.record(index))
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// One row viewed as an ordered mapping from column name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    fields: Vec<(&'a str, &'a Value)>,
}

impl<'a> Record<'a> {
    /// Returns the first value whose column is named `column`.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| *value)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + '_ {
        self.fields.iter().copied()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A single value from a database query.
///
/// Engine types are narrowed to the handful the console renders: temporal and
/// decimal types arrive as text or numbers, and nested LIST/STRUCT/MAP values
/// arrive as JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    Text(String),

    /// Nested engine value rendered as JSON text.
    Json(String),
}

impl Value {
    /// Interprets the value as a flag (booleans and 0/1 integers).
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Converts the value to a string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) | Value::Json(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
