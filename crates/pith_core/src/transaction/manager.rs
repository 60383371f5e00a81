//! Transaction manager.

use crate::error::{CoreError, CoreResult};
use crate::query::execute_update;
use crate::statement::StatementCache;
use crate::transaction::state::{TransactionOutcome, TransactionState};
use rusqlite::Connection;

const BEGIN_SQL: &str = "begin exclusive transaction";
const COMMIT_SQL: &str = "commit transaction";
const ROLLBACK_SQL: &str = "rollback transaction";

/// Counters for transactions run on a handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStats {
    /// Transactions begun.
    pub started: u64,
    /// Transactions committed.
    pub committed: u64,
    /// Transactions rolled back.
    pub rolled_back: u64,
}

/// Tracks the single transaction a handle may have open.
///
/// The begin/commit/rollback statements go through the statement cache like
/// any other SQL.
#[derive(Debug, Default)]
pub struct TransactionManager {
    state: TransactionState,
    last_outcome: Option<TransactionOutcome>,
    stats: TransactionStats,
}

impl TransactionManager {
    /// Creates an idle manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Returns how the last finished transaction ended.
    #[must_use]
    pub fn last_outcome(&self) -> Option<TransactionOutcome> {
        self.last_outcome
    }

    /// Returns transaction counters.
    #[must_use]
    pub fn stats(&self) -> TransactionStats {
        self.stats
    }

    /// Fails if a transaction is open.
    pub fn ensure_idle(&self) -> CoreResult<()> {
        if self.state.is_active() {
            return Err(CoreError::invalid_operation(
                "a transaction is already active on this database",
            ));
        }
        Ok(())
    }

    /// Opens an exclusive transaction.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error if one is already open, or an
    /// engine error if the engine refuses (for example, the database is
    /// locked by another connection). The state stays idle on failure.
    pub(crate) fn begin(
        &mut self,
        conn: &Connection,
        statements: &mut StatementCache,
    ) -> CoreResult<()> {
        self.ensure_idle()?;
        execute_update(conn, statements, BEGIN_SQL, &[])?;
        self.state = TransactionState::Active;
        self.stats.started += 1;
        tracing::trace!("transaction started");
        Ok(())
    }

    /// Commits the open transaction.
    ///
    /// # Errors
    ///
    /// If the engine refuses the commit the transaction stays open; the
    /// caller is expected to roll back.
    pub(crate) fn commit(
        &mut self,
        conn: &Connection,
        statements: &mut StatementCache,
    ) -> CoreResult<()> {
        if !self.state.is_active() {
            return Err(CoreError::invalid_operation("no transaction to commit"));
        }
        execute_update(conn, statements, COMMIT_SQL, &[])?;
        self.finish(TransactionOutcome::Committed);
        Ok(())
    }

    /// Rolls back the open transaction.
    ///
    /// Never fails: a failing rollback is logged and swallowed, since the
    /// engine may already have rolled back on its own after the error that
    /// led here.
    pub(crate) fn rollback(&mut self, conn: &Connection, statements: &mut StatementCache) {
        if !self.state.is_active() {
            tracing::warn!("rollback requested with no active transaction");
            return;
        }

        tracing::warn!("transaction is being rolled back");
        if conn.is_autocommit() {
            tracing::debug!("engine already left the transaction");
        }
        if let Err(err) = execute_update(conn, statements, ROLLBACK_SQL, &[]) {
            tracing::error!("error while rolling back transaction, probably harmless: {err}");
        }
        self.finish(TransactionOutcome::RolledBack);
    }

    fn finish(&mut self, outcome: TransactionOutcome) {
        self.state = TransactionState::Idle;
        self.last_outcome = Some(outcome);
        match outcome {
            TransactionOutcome::Committed => self.stats.committed += 1,
            TransactionOutcome::RolledBack => self.stats.rolled_back += 1,
        }
    }
}
