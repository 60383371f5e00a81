//! Transaction state.

/// Whether a transaction is open on the handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction is open.
    #[default]
    Idle,
    /// An exclusive transaction is open.
    Active,
}

/// How the most recent transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Changes were committed.
    Committed,
    /// Changes were rolled back.
    RolledBack,
}

impl TransactionState {
    /// Returns true if a transaction is open.
    #[must_use]
    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}
