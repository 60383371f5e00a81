//! Batch command implementation.

use super::read_file;
use pith_core::{BatchSummary, Database};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Batch outcome, printed as JSON.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    /// Operations in the batch.
    pub operations: usize,
    /// Statement executions.
    pub executions: usize,
    /// Rows changed.
    pub rows_changed: usize,
    /// Records marked as delivered.
    pub added: usize,
    /// Records forgotten.
    pub removed: usize,
}

impl From<BatchSummary> for BatchReport {
    fn from(summary: BatchSummary) -> Self {
        Self {
            operations: summary.operations,
            executions: summary.executions,
            rows_changed: summary.rows_changed,
            added: summary.added,
            removed: summary.removed,
        }
    }
}

/// Runs the batch in `file`.
pub fn run(db: &mut Database, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running batch from {:?}", file);

    let batch = pith_value::from_json(&read_file(file)?)?;
    let report = BatchReport::from(db.batch_value(&batch)?);

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
