//! Read commands.

use super::{parse_args, print_value};
use pith_core::Database;
use pith_value::Value;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Runs `find`.
pub fn find(db: &mut Database, table: &str, id: &str) -> CommandResult {
    let value = db.find(table, id)?.map_or(Value::Null, Value::from);
    print_value(&value)
}

/// Runs `query`.
pub fn query(db: &mut Database, table: &str, sql: &str, args: Option<&str>) -> CommandResult {
    let records = db.query(table, sql, &parse_args(args)?)?;
    print_value(&Value::from(records))
}

/// Runs `query-array`.
pub fn query_array(
    db: &mut Database,
    table: &str,
    sql: &str,
    args: Option<&str>,
) -> CommandResult {
    let result = db.query_as_array(table, sql, &parse_args(args)?)?;
    print_value(&Value::from(result))
}

/// Runs `query-ids`.
pub fn query_ids(db: &mut Database, sql: &str, args: Option<&str>) -> CommandResult {
    let ids = db.query_ids(sql, &parse_args(args)?)?;
    print_value(&Value::from(ids))
}

/// Runs `raw`.
pub fn raw(db: &mut Database, sql: &str, args: Option<&str>) -> CommandResult {
    let rows = db.unsafe_query_raw(sql, &parse_args(args)?)?;
    print_value(&Value::from(rows))
}

/// Runs `count`.
pub fn count(db: &mut Database, sql: &str, args: Option<&str>) -> CommandResult {
    println!("{}", db.count(sql, &parse_args(args)?)?);
    Ok(())
}

/// Runs `get-local`.
pub fn get_local(db: &mut Database, key: &str) -> CommandResult {
    print_value(&Value::from(db.get_local(key)?))
}
