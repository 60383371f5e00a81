//! Transaction management.
//!
//! PithDB wraps every write in one exclusive engine transaction. The
//! manager only tracks whether a transaction is open; the engine does the
//! real work. Nested transactions are not supported.

mod manager;
mod state;

pub use manager::{TransactionManager, TransactionStats};
pub use state::{TransactionOutcome, TransactionState};
