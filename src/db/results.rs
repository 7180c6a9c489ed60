//! Query result normalization
//!
//! Raw rows fetched from a cursor are collapsed so that single-value
//! queries (existence checks, `SELECT SYSTEM_USER`) can be consumed without
//! index bookkeeping, and can be re-shaped into column-keyed records.

use crate::db::types::{CellValue, ColumnDef, Row};
use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;

/// A row keyed by column name. `BTreeMap` keeps keys sorted.
pub type Record = BTreeMap<String, CellValue>;

/// Normalized result of one statement
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The statement returned no rows
    Empty,
    /// Exactly one row with one column, or two columns whose second is blank
    Scalar(CellValue),
    /// Exactly one row that could not be collapsed further
    Row(Row),
    /// Two or more rows, in fetch order
    Rows(Vec<Row>),
}

impl QueryResult {
    /// Apply the collapsing rule to a fetched row set.
    pub fn normalize(mut rows: Vec<Row>) -> Self {
        match rows.len() {
            0 => QueryResult::Empty,
            1 => {
                let row = rows.remove(0);
                let collapses = row.len() == 1
                    || (row.len() == 2 && row.values.get(1).is_some_and(CellValue::is_blank));
                if collapses {
                    let mut values = row.values;
                    QueryResult::Scalar(values.swap_remove(0))
                } else {
                    QueryResult::Row(row)
                }
            }
            _ => QueryResult::Rows(rows),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, QueryResult::Empty)
    }

    pub fn as_scalar(&self) -> Option<&CellValue> {
        match self {
            QueryResult::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Number of rows the result stands for
    pub fn row_count(&self) -> usize {
        match self {
            QueryResult::Empty => 0,
            QueryResult::Scalar(_) | QueryResult::Row(_) => 1,
            QueryResult::Rows(rows) => rows.len(),
        }
    }

    /// JSON projection used by the command line output
    pub fn to_json(&self) -> serde_json::Value {
        let row_json = |r: &Row| serde_json::Value::Array(r.values.iter().map(CellValue::to_json).collect());
        match self {
            QueryResult::Empty => serde_json::Value::Null,
            QueryResult::Scalar(v) => v.to_json(),
            QueryResult::Row(r) => row_json(r),
            QueryResult::Rows(rows) => serde_json::Value::Array(rows.iter().map(row_json).collect()),
        }
    }
}

/// Re-shape raw rows into records keyed by column name.
///
/// Columns past the end of a short row are left out of that row's record.
pub fn to_records(columns: Option<&[ColumnDef]>, rows: &[Row]) -> DbResult<Vec<Record>> {
    let columns = columns.ok_or(DbError::NoResultsToConvert)?;
    Ok(rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(row.values.iter())
                .map(|(col, value)| (col.name.clone(), value.clone()))
                .collect()
        })
        .collect())
}

/// JSON projection of records
pub fn records_to_json(records: &[Record]) -> serde_json::Value {
    serde_json::Value::Array(
        records
            .iter()
            .map(|rec| {
                serde_json::Value::Object(
                    rec.iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect(),
                )
            })
            .collect(),
    )
}
