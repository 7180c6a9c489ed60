//! Database type definitions
//!
//! Core data structures for representing dialects, column metadata,
//! rows and values, independent of any driver's native row type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    SqlServer,
    Sqlite,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::SqlServer => "sqlserver",
            Dialect::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column definition from cursor metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type as reported by the driver
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Database data types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Integer types
    SmallInt,
    Integer,
    BigInt,

    // Floating point
    Real,
    Double,
    Numeric,

    // Text types
    Text,
    Varchar(Option<usize>),
    Char(Option<usize>),

    // Boolean
    Boolean,

    // Date/time types
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,

    // JSON types
    Json,
    Jsonb,

    // Binary data
    Bytea,

    // UUID
    Uuid,

    // Array type
    Array(Box<DataType>),

    // Other/unknown types
    Unknown(String),
}

/// A single row of query results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    /// Cell values in column order
    pub values: Vec<CellValue>,
}

/// A cell value (single column value in a row)
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// NULL value
    Null,

    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Text/string value
    Text(String),

    /// Boolean value
    Boolean(bool),

    /// JSON value (parsed)
    Json(serde_json::Value),

    /// Binary data
    Binary(Vec<u8>),

    /// Date/time value (stored as string)
    DateTime(String),

    /// UUID value
    Uuid(String),

    /// Array value
    Array(Vec<CellValue>),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::SmallInt => f.write_str("smallint"),
            DataType::Integer => f.write_str("integer"),
            DataType::BigInt => f.write_str("bigint"),
            DataType::Real => f.write_str("real"),
            DataType::Double => f.write_str("double precision"),
            DataType::Numeric => f.write_str("numeric"),
            DataType::Text => f.write_str("text"),
            DataType::Varchar(Some(n)) => write!(f, "varchar({})", n),
            DataType::Varchar(None) => f.write_str("varchar"),
            DataType::Char(Some(n)) => write!(f, "char({})", n),
            DataType::Char(None) => f.write_str("char"),
            DataType::Boolean => f.write_str("boolean"),
            DataType::Date => f.write_str("date"),
            DataType::Time => f.write_str("time"),
            DataType::Timestamp => f.write_str("timestamp"),
            DataType::TimestampTz => f.write_str("timestamptz"),
            DataType::Interval => f.write_str("interval"),
            DataType::Json => f.write_str("json"),
            DataType::Jsonb => f.write_str("jsonb"),
            DataType::Bytea => f.write_str("bytea"),
            DataType::Uuid => f.write_str("uuid"),
            DataType::Array(inner) => write!(f, "{}[]", inner),
            DataType::Unknown(s) => f.write_str(s),
        }
    }
}

impl DataType {
    /// Map a declared column type (SQLite affinity rules) to a DataType.
    ///
    /// SQLite accepts almost any type name, so this matches on substrings
    /// in the same order SQLite resolves affinity.
    pub fn from_declared(decl: &str) -> DataType {
        let upper = decl.trim().to_ascii_uppercase();
        if upper.is_empty() {
            DataType::Unknown(String::new())
        } else if upper.contains("INT") {
            DataType::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            DataType::Text
        } else if upper.contains("BLOB") {
            DataType::Bytea
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            DataType::Double
        } else if upper.contains("BOOL") {
            DataType::Boolean
        } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
            DataType::Timestamp
        } else if upper == "DATE" {
            DataType::Date
        } else if upper.contains("JSON") {
            DataType::Json
        } else if upper.contains("NUMERIC") || upper.contains("DECIMAL") {
            DataType::Numeric
        } else {
            DataType::Unknown(decl.trim().to_string())
        }
    }
}

impl CellValue {
    /// Check if this is a NULL value
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// True for the empty string only; NULL is not blank.
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Uuid(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value for serialized output
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            CellValue::Null => Value::Null,
            CellValue::Integer(i) => Value::from(*i),
            CellValue::Float(f) => Value::from(*f),
            CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Uuid(s) => {
                Value::String(s.clone())
            }
            CellValue::Boolean(b) => Value::Bool(*b),
            CellValue::Json(v) => v.clone(),
            CellValue::Binary(b) => Value::Array(b.iter().map(|x| Value::from(*x)).collect()),
            CellValue::Array(arr) => Value::Array(arr.iter().map(CellValue::to_json).collect()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl Row {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&CellValue> {
        self.values.get(idx)
    }
}

impl<V: Into<CellValue>> FromIterator<V> for Row {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Row::new(iter.into_iter().map(Into::into).collect())
    }
}
