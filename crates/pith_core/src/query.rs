//! Query engine.
//!
//! Binds host values to statement placeholders, steps statements and turns
//! rows into host results. The cache-aware reads consult the presence cache
//! per row and only mark records once the whole read has succeeded.

use crate::cache::{validate_table_name, CacheKey};
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::marshal::{
    column_integer, ensure_id_column, record_id, result_array, result_columns,
    result_dictionary,
};
use crate::statement::{Statement, StatementCache};
use crate::types::{ArrayQueryResult, Cached, Record};
use pith_value::Value;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, Rows};
use std::collections::HashSet;

/// Binds `args` to the statement's placeholders, in order.
///
/// Every argument is converted before anything is bound, so a bad argument
/// never leaves the statement half-bound.
///
/// # Errors
///
/// Returns a contract violation if the argument count differs from the
/// placeholder count, or if an argument is an array or dictionary.
pub(crate) fn bind_args(statement: &mut Statement<'_>, args: &[Value]) -> CoreResult<()> {
    let expected = statement.parameter_count();
    if expected != args.len() {
        return Err(CoreError::contract_violation(format!(
            "Number of args passed to query doesn't match number of arg placeholders \
             (expected {expected}, got {})",
            args.len()
        )));
    }

    let values = args
        .iter()
        .map(sql_value)
        .collect::<CoreResult<Vec<_>>>()?;

    for (index, value) in values.iter().enumerate() {
        statement
            .raw_bind_parameter(index + 1, value)
            .map_err(|e| CoreError::engine("Failed to bind an argument for query", &e))?;
    }
    Ok(())
}

fn sql_value(value: &Value) -> CoreResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Text(text) => Ok(SqlValue::Text(text.clone())),
        Value::Number(n) => Ok(SqlValue::Real(*n)),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Array(_) | Value::Dictionary(_) => Err(CoreError::contract_violation(format!(
            "Invalid argument type ({}) for query",
            value.kind()
        ))),
    }
}

/// Fetches the compiled statement for `sql` and binds `args` to it.
pub(crate) fn execute_query<'conn>(
    conn: &'conn Connection,
    statements: &mut StatementCache,
    sql: &str,
    args: &[Value],
) -> CoreResult<Statement<'conn>> {
    let mut statement = statements.prepare(conn, sql)?;
    bind_args(&mut statement, args)?;
    Ok(statement)
}

/// Runs a statement that returns no rows. Returns the number of rows changed.
pub(crate) fn execute_update(
    conn: &Connection,
    statements: &mut StatementCache,
    sql: &str,
    args: &[Value],
) -> CoreResult<usize> {
    let mut statement = execute_query(conn, statements, sql, args)?;
    statement
        .raw_execute()
        .map_err(|e| CoreError::engine("Failed to execute db update", &e))
}

fn next_row<'a, 'stmt>(rows: &'a mut Rows<'stmt>) -> CoreResult<Option<&'a Row<'stmt>>> {
    rows.next()
        .map_err(|e| CoreError::engine("Failed to get a row for query", &e))
}

impl Database {
    /// Fetches one record by id.
    ///
    /// Returns `None` if no row matches, a bare-id reference if the record
    /// was already delivered, and the full record otherwise (marking it as
    /// delivered).
    ///
    /// # Errors
    ///
    /// Returns a contract violation for an invalid table name or an
    /// unsupported column type, and an engine error if the lookup fails.
    pub fn find(&mut self, table: &str, id: &str) -> CoreResult<Option<Cached<Record>>> {
        let key = CacheKey::new(table, id)?;
        if self.presence.is_cached(&key) {
            return Ok(Some(Cached::Reference(id.to_string())));
        }

        let sql = format!("select * from `{table}` where id == ? limit 1");
        let mut statement =
            execute_query(&self.conn, &mut self.statements, &sql, &[Value::from(id)])?;
        let columns = result_columns(&statement);
        let mut rows = statement.raw_query();

        let Some(row) = next_row(&mut rows)? else {
            return Ok(None);
        };
        let record = result_dictionary(row, &columns)?;
        self.presence.mark_as_cached(key);
        Ok(Some(Cached::Full(record)))
    }

    /// Runs a cache-aware query returning records as dictionaries.
    ///
    /// The first result column must be `id`. Records already delivered come
    /// back as bare ids.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole query and leaves the presence cache
    /// untouched.
    pub fn query(
        &mut self,
        table: &str,
        sql: &str,
        args: &[Value],
    ) -> CoreResult<Vec<Cached<Record>>> {
        let (_, records) = self.diff_rows(table, sql, args, result_dictionary)?;
        Ok(records)
    }

    /// Runs a cache-aware query returning records as positional arrays.
    ///
    /// Same rules as [`Database::query`]; the result also carries the column
    /// names so the host can map positions back to attributes.
    pub fn query_as_array(
        &mut self,
        table: &str,
        sql: &str,
        args: &[Value],
    ) -> CoreResult<ArrayQueryResult> {
        let (columns, rows) =
            self.diff_rows(table, sql, args, |row, columns| result_array(row, columns.len()))?;
        Ok(ArrayQueryResult { columns, rows })
    }

    /// Shared row loop of the cache-aware reads.
    fn diff_rows<T>(
        &mut self,
        table: &str,
        sql: &str,
        args: &[Value],
        mut read: impl FnMut(&Row<'_>, &[String]) -> CoreResult<T>,
    ) -> CoreResult<(Vec<String>, Vec<Cached<T>>)> {
        validate_table_name(table)?;

        let mut statement = execute_query(&self.conn, &mut self.statements, sql, args)?;
        let columns = result_columns(&statement);
        let mut rows = statement.raw_query();

        let mut results = Vec::new();
        let mut delivered = HashSet::new();
        while let Some(row) = next_row(&mut rows)? {
            if results.is_empty() {
                ensure_id_column(&columns)?;
            }
            let id = record_id(row)?;
            let key = CacheKey::compose(table, &id);
            if self.presence.is_cached(&key) || delivered.contains(&key) {
                results.push(Cached::Reference(id));
            } else {
                results.push(Cached::Full(read(row, &columns)?));
                delivered.insert(key);
            }
        }
        drop(rows);

        for key in delivered {
            self.presence.mark_as_cached(key);
        }
        Ok((columns, results))
    }

    /// Runs a query and returns only the ids (first column) of every row.
    ///
    /// Does not touch the presence cache.
    pub fn query_ids(&mut self, sql: &str, args: &[Value]) -> CoreResult<Vec<String>> {
        let mut statement = execute_query(&self.conn, &mut self.statements, sql, args)?;
        let columns = result_columns(&statement);
        let mut rows = statement.raw_query();

        let mut ids = Vec::new();
        while let Some(row) = next_row(&mut rows)? {
            if ids.is_empty() {
                ensure_id_column(&columns)?;
            }
            ids.push(record_id(row)?);
        }
        Ok(ids)
    }

    /// Runs an arbitrary query and returns every row as a dictionary.
    ///
    /// Bypasses the presence cache entirely: results are always full rows and
    /// nothing is marked.
    pub fn unsafe_query_raw(&mut self, sql: &str, args: &[Value]) -> CoreResult<Vec<Record>> {
        let mut statement = execute_query(&self.conn, &mut self.statements, sql, args)?;
        let columns = result_columns(&statement);
        let mut rows = statement.raw_query();

        let mut records = Vec::new();
        while let Some(row) = next_row(&mut rows)? {
            records.push(result_dictionary(row, &columns)?);
        }
        Ok(records)
    }

    /// Runs a query that must produce exactly one row with one column.
    ///
    /// # Errors
    ///
    /// Returns a contract violation if the statement has more than one
    /// column or produces no row.
    pub fn count(&mut self, sql: &str, args: &[Value]) -> CoreResult<i64> {
        let mut statement = execute_query(&self.conn, &mut self.statements, sql, args)?;
        if statement.column_count() != 1 {
            return Err(CoreError::contract_violation(format!(
                "Count query must return exactly one column, got {}",
                statement.column_count()
            )));
        }
        let mut rows = statement.raw_query();
        let row = next_row(&mut rows)?
            .ok_or_else(|| CoreError::contract_violation("Count query returned no rows"))?;
        column_integer(row, 0)
    }

    /// Reads a value from the `local_storage` key/value table.
    ///
    /// Returns `None` if the key is absent or its value is null.
    pub fn get_local(&mut self, key: &str) -> CoreResult<Option<String>> {
        let mut statement = execute_query(
            &self.conn,
            &mut self.statements,
            "select value from local_storage where key = ?",
            &[Value::from(key)],
        )?;
        let mut rows = statement.raw_query();
        let Some(row) = next_row(&mut rows)? else {
            return Ok(None);
        };
        match crate::marshal::column_value(row, 0)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value)),
            other => Err(CoreError::contract_violation(format!(
                "local_storage value for {key:?} is a {}, expected a string",
                other.kind()
            ))),
        }
    }

    /// Runs a multi-statement SQL script with no bound arguments.
    pub fn execute_multiple(&mut self, script: &str) -> CoreResult<()> {
        self.conn
            .execute_batch(script)
            .map_err(|e| CoreError::engine("Failed to execute statements", &e))
    }
}
