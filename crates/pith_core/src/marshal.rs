//! Row-to-record conversion.
//!
//! Every function here reads a row the statement is currently positioned
//! on. Integers are widened to doubles because the host has a single number
//! type. Blobs (and anything else that is not integer, float, text or null)
//! are rejected; the caller must treat that as terminating the whole query.

use crate::error::{CoreError, CoreResult};
use crate::statement::Statement;
use crate::types::{Record, RecordArray};
use pith_value::Value;
use rusqlite::types::ValueRef;
use rusqlite::Row;

/// Name every cache-aware query must use for its first column.
pub const ID_COLUMN: &str = "id";

/// Converts column `index` of `row` into a host value.
///
/// # Errors
///
/// Returns a contract violation for blob columns or text that is not
/// valid UTF-8.
#[allow(clippy::cast_precision_loss)]
pub fn column_value(row: &Row<'_>, index: usize) -> CoreResult<Value> {
    let raw = row
        .get_ref(index)
        .map_err(|e| CoreError::engine("Failed to read a column", &e))?;

    match raw {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(n) => Ok(Value::Number(n as f64)),
        ValueRef::Real(n) => Ok(Value::Number(n)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|text| Value::Text(text.to_string()))
            .map_err(|_| {
                CoreError::contract_violation(format!(
                    "Unable to fetch record from database - column {index} holds invalid UTF-8"
                ))
            }),
        ValueRef::Blob(_) => Err(CoreError::contract_violation(
            "Unable to fetch record from database - unknown column type \
             (blobs and custom column types are not supported)",
        )),
    }
}

/// Reads column `index` as an integer (counts, pragma values).
///
/// Floats are truncated.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn column_integer(row: &Row<'_>, index: usize) -> CoreResult<i64> {
    let raw = row
        .get_ref(index)
        .map_err(|e| CoreError::engine("Failed to read a column", &e))?;
    match raw {
        ValueRef::Integer(n) => Ok(n),
        ValueRef::Real(n) => Ok(n as i64),
        other => Err(CoreError::contract_violation(format!(
            "Expected an integer in column {index}, found {}",
            other.data_type()
        ))),
    }
}

/// Reads the whole row as a dictionary keyed by column name.
///
/// `columns` must be the statement's column names, in order. A later column
/// with a repeated name overwrites the earlier one.
pub fn result_dictionary(row: &Row<'_>, columns: &[String]) -> CoreResult<Record> {
    let mut record = Record::new();
    for (index, name) in columns.iter().enumerate() {
        record.insert(name.clone(), column_value(row, index)?);
    }
    Ok(record)
}

/// Reads the whole row as an array in column order.
pub fn result_array(row: &Row<'_>, column_count: usize) -> CoreResult<RecordArray> {
    (0..column_count)
        .map(|index| column_value(row, index))
        .collect()
}

/// Returns the statement's result column names.
#[must_use]
pub fn result_columns(statement: &Statement<'_>) -> Vec<String> {
    statement
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Checks that the first result column is the record id.
pub(crate) fn ensure_id_column(columns: &[String]) -> CoreResult<()> {
    match columns.first() {
        Some(first) if first == ID_COLUMN => Ok(()),
        Some(first) => Err(CoreError::contract_violation(format!(
            "First result column must be `{ID_COLUMN}`, found `{first}`"
        ))),
        None => Err(CoreError::contract_violation(format!(
            "Query returns no columns; expected `{ID_COLUMN}` first"
        ))),
    }
}

/// Reads the record id from the first column.
///
/// # Errors
///
/// Returns a contract violation if the id is null or not text.
pub(crate) fn record_id(row: &Row<'_>) -> CoreResult<String> {
    match column_value(row, 0)? {
        Value::Text(id) => Ok(id),
        _ => Err(CoreError::contract_violation("Failed to get ID of a record")),
    }
}
