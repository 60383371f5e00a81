//! Atomic batched writes.
//!
//! A batch is a list of operations, each one SQL text executed once per
//! argument list. All of it runs in a single exclusive transaction. Cache
//! effects are buffered while the transaction runs and applied only after
//! the commit returns: adds first, then removes.

use crate::cache::{validate_table_name, CacheKey};
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::query::execute_update;
use pith_value::Value;

/// What a batch operation does to the presence cache for each record it
/// touches. The record id is the first argument of each argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBehavior {
    /// Leave the cache alone.
    None,
    /// Mark the record as delivered (the host holds the values it wrote).
    MarkAdded,
    /// Forget the record.
    MarkRemoved,
}

impl CacheBehavior {
    /// Decodes the host's numeric code: 0 none, 1 add, -1 remove.
    ///
    /// # Errors
    ///
    /// Any other number is a contract violation.
    pub fn from_code(code: f64) -> CoreResult<Self> {
        match code {
            c if c == 0.0 => Ok(Self::None),
            c if c == 1.0 => Ok(Self::MarkAdded),
            c if c == -1.0 => Ok(Self::MarkRemoved),
            other => Err(CoreError::contract_violation(format!(
                "Invalid cache behavior {other} (expected -1, 0 or 1)"
            ))),
        }
    }

    /// Returns the host's numeric code.
    #[must_use]
    pub fn code(self) -> i8 {
        match self {
            Self::None => 0,
            Self::MarkAdded => 1,
            Self::MarkRemoved => -1,
        }
    }
}

/// One operation of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOperation {
    /// Cache effect per argument list.
    pub cache_behavior: CacheBehavior,
    /// Table the records live in. Unused when `cache_behavior` is `None`.
    pub table: String,
    /// Statement to run.
    pub sql: String,
    /// One argument list per execution.
    pub args: Vec<Vec<Value>>,
}

impl BatchOperation {
    /// Creates an operation with no argument lists yet.
    pub fn new(
        cache_behavior: CacheBehavior,
        table: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        Self {
            cache_behavior,
            table: table.into(),
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    /// An operation that writes records the host now holds.
    pub fn insert(table: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(CacheBehavior::MarkAdded, table, sql)
    }

    /// An operation that deletes records.
    pub fn delete(table: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(CacheBehavior::MarkRemoved, table, sql)
    }

    /// An operation with no cache effect.
    pub fn execute(sql: impl Into<String>) -> Self {
        Self::new(CacheBehavior::None, String::new(), sql)
    }

    /// Adds one argument list.
    #[must_use]
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args.push(args);
        self
    }

    /// Decodes `[cacheBehavior, table, sql, [[args]]]`.
    ///
    /// The table element is only read when the behavior is not `0`.
    ///
    /// # Errors
    ///
    /// Returns a contract violation for any other shape.
    pub fn from_value(value: &Value) -> CoreResult<Self> {
        let cache_behavior = CacheBehavior::from_code(value.element(0)?.expect_number()?)?;
        let table = if cache_behavior == CacheBehavior::None {
            String::new()
        } else {
            value.element(1)?.expect_text()?.to_string()
        };
        let sql = value.element(2)?.expect_text()?.to_string();
        let args = value
            .element(3)?
            .expect_array()?
            .iter()
            .map(|list| list.expect_array().map(<[Value]>::to_vec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cache_behavior,
            table,
            sql,
            args,
        })
    }

    /// Checks everything that can be checked before touching the engine.
    fn validate(&self) -> CoreResult<()> {
        if self.cache_behavior == CacheBehavior::None {
            return Ok(());
        }
        validate_table_name(&self.table)?;
        for args in &self.args {
            self.cache_key(args)?;
        }
        Ok(())
    }

    fn cache_key(&self, args: &[Value]) -> CoreResult<CacheKey> {
        match args.first() {
            Some(Value::Text(id)) => Ok(CacheKey::compose(&self.table, id)),
            _ => Err(CoreError::contract_violation(format!(
                "Batch operation on `{}` needs the record id as its first argument",
                self.table
            ))),
        }
    }
}

/// Decodes a whole batch from its host representation.
pub fn parse_batch(value: &Value) -> CoreResult<Vec<BatchOperation>> {
    value
        .expect_array()?
        .iter()
        .map(BatchOperation::from_value)
        .collect()
}

/// What a committed batch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Operations in the batch.
    pub operations: usize,
    /// Statement executions (one per argument list).
    pub executions: usize,
    /// Rows changed, as reported by the engine.
    pub rows_changed: usize,
    /// Records marked as delivered.
    pub added: usize,
    /// Records forgotten.
    pub removed: usize,
}

impl Database {
    /// Executes a batch atomically.
    ///
    /// Either every execution commits and the cache effects apply, or
    /// nothing is persisted and the cache is unchanged.
    ///
    /// # Errors
    ///
    /// Malformed operations are rejected before the transaction begins.
    /// Engine failures roll back the transaction and are returned as is.
    pub fn batch(&mut self, operations: &[BatchOperation]) -> CoreResult<BatchSummary> {
        for operation in operations {
            operation.validate()?;
        }

        let (summary, added, removed) = self.in_transaction(|db| {
            let mut summary = BatchSummary {
                operations: operations.len(),
                ..BatchSummary::default()
            };
            let mut added = Vec::new();
            let mut removed = Vec::new();

            for operation in operations {
                for args in &operation.args {
                    summary.rows_changed +=
                        execute_update(&db.conn, &mut db.statements, &operation.sql, args)?;
                    summary.executions += 1;
                    match operation.cache_behavior {
                        CacheBehavior::None => {}
                        CacheBehavior::MarkAdded => added.push(operation.cache_key(args)?),
                        CacheBehavior::MarkRemoved => removed.push(operation.cache_key(args)?),
                    }
                }
            }
            Ok((summary, added, removed))
        })?;

        let summary = BatchSummary {
            added: added.len(),
            removed: removed.len(),
            ..summary
        };
        for key in added {
            self.presence.mark_as_cached(key);
        }
        for key in &removed {
            self.presence.remove_from_cache(key);
        }

        tracing::debug!(
            operations = summary.operations,
            executions = summary.executions,
            added = summary.added,
            removed = summary.removed,
            "batch committed"
        );
        Ok(summary)
    }

    /// Decodes and executes a batch given in its host representation.
    pub fn batch_value(&mut self, operations: &Value) -> CoreResult<BatchSummary> {
        let operations = parse_batch(operations)?;
        self.batch(&operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{TransactionOutcome, TransactionState};
    use pith_value::from_json;

    const INSERT: &str = "insert into notes (id, title) values (?, ?)";
    const DELETE: &str = "delete from notes where id = ?";

    fn db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.execute_multiple("create table notes (id text primary key, title text);")
            .unwrap();
        db
    }

    fn note(id: &str) -> Vec<Value> {
        vec![Value::from(id), Value::from(format!("title {id}"))]
    }

    #[test]
    fn commit_applies_adds_then_removes() {
        let mut db = db();

        let summary = db
            .batch(&[
                BatchOperation::insert("notes", INSERT)
                    .with_args(note("a"))
                    .with_args(note("b")),
                BatchOperation::delete("notes", DELETE).with_args(vec![Value::from("b")]),
            ])
            .unwrap();

        assert_eq!(summary.executions, 3);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.removed, 1);
        assert!(db.is_cached("notes", "a").unwrap());
        assert!(!db.is_cached("notes", "b").unwrap());
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 1);
    }

    #[test]
    fn failure_rolls_back_everything() {
        let mut db = db();
        db.batch(&[BatchOperation::insert("notes", INSERT).with_args(note("a"))])
            .unwrap();

        let err = db
            .batch(&[
                BatchOperation::insert("notes", INSERT).with_args(note("b")),
                BatchOperation::insert("notes", INSERT).with_args(note("a")),
            ])
            .unwrap_err();

        assert_eq!(err.engine_code(), Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY));
        assert!(err.to_string().starts_with("Failed to execute db update"));
        assert_eq!(db.last_transaction_outcome(), Some(TransactionOutcome::RolledBack));
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 1);
        assert!(!db.is_cached("notes", "b").unwrap());
    }

    #[test]
    fn commit_failure_rolls_back_and_leaves_cache_alone() {
        let mut db = Database::open_in_memory().unwrap();
        db.execute_multiple(
            "pragma foreign_keys = on;
             create table parents (id text primary key);
             create table children (
                 id text primary key,
                 parent text references parents(id) deferrable initially deferred
             );",
        )
        .unwrap();

        let err = db
            .batch(&[BatchOperation::insert(
                "children",
                "insert into children (id, parent) values (?, ?)",
            )
            .with_args(vec![Value::from("c1"), Value::from("missing")])])
            .unwrap_err();

        assert_eq!(err.engine_code(), Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY));
        assert!(err.to_string().contains("sqlite error 787"));
        assert_eq!(db.count("select count(*) from children", &[]).unwrap(), 0);
        assert!(!db.is_cached("children", "c1").unwrap());
        assert!(db.presence().is_empty());
        assert_eq!(db.transaction_state(), TransactionState::Idle);
        assert_eq!(db.last_transaction_outcome(), Some(TransactionOutcome::RolledBack));
    }

    #[test]
    fn validation_happens_before_begin() {
        let mut db = db();

        let err = db
            .batch(&[
                BatchOperation::insert("notes", INSERT).with_args(note("a")),
                BatchOperation::insert("notes", INSERT)
                    .with_args(vec![Value::Number(1.0), Value::from("x")]),
            ])
            .unwrap_err();

        assert!(err.is_contract_violation());
        assert_eq!(db.transaction_stats().started, 0);
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 0);
    }

    #[test]
    fn no_cache_operation_ignores_table() {
        let mut db = db();

        db.batch(&[BatchOperation::execute(INSERT).with_args(note("a"))])
            .unwrap();

        assert!(db.presence().is_empty());
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 1);
    }

    #[test]
    fn empty_batch_commits() {
        let mut db = db();
        let summary = db.batch(&[]).unwrap();
        assert_eq!(summary, BatchSummary::default());
        assert_eq!(db.last_transaction_outcome(), Some(TransactionOutcome::Committed));
    }

    #[test]
    fn host_representation() {
        let mut db = db();
        let batch = from_json(
            r#"[
                [1, "notes", "insert into notes (id, title) values (?, ?)", [["a", "A"], ["b", "B"]]],
                [0, null, "update notes set title = ? where id = ?", [["AA", "a"]]],
                [-1, "notes", "delete from notes where id = ?", [["b"]]]
            ]"#,
        )
        .unwrap();

        let summary = db.batch_value(&batch).unwrap();

        assert_eq!(summary.operations, 3);
        assert_eq!(summary.rows_changed, 4);
        assert!(db.is_cached("notes", "a").unwrap());
        assert!(!db.is_cached("notes", "b").unwrap());
    }

    #[test]
    fn bad_cache_behavior_code() {
        let value = from_json(r#"[2, "notes", "select 1", []]"#).unwrap();
        assert!(BatchOperation::from_value(&value)
            .unwrap_err()
            .is_contract_violation());
        assert!(CacheBehavior::from_code(0.5).is_err());
    }

    #[test]
    fn behavior_codes_round_trip() {
        for behavior in [
            CacheBehavior::None,
            CacheBehavior::MarkAdded,
            CacheBehavior::MarkRemoved,
        ] {
            assert_eq!(
                CacheBehavior::from_code(f64::from(behavior.code())).unwrap(),
                behavior
            );
        }
    }
}
