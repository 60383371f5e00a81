//! # PithDB Core
//!
//! Caching, transactional record layer over an embedded SQLite database.
//!
//! This crate provides:
//! - A prepared-statement cache keyed by SQL text
//! - A record presence cache, so records the host already holds come back
//!   as bare ids instead of full rows
//! - Cache-aware and plain queries with host-value argument binding
//! - Atomic batched writes whose cache effects apply only after commit
//! - Schema versioning through the database header's `user_version`
//!
//! ## Usage
//!
//! ```
//! use pith_core::{BatchOperation, Cached, Database};
//! use pith_value::Value;
//!
//! let mut db = Database::open_in_memory().unwrap();
//! db.unsafe_reset_database("create table notes (id text primary key, title text);", 1)
//!     .unwrap();
//!
//! db.batch(&[BatchOperation::insert("notes", "insert into notes values (?, ?)")
//!     .with_args(vec![Value::from("n1"), Value::from("Groceries")])])
//!     .unwrap();
//!
//! // The host wrote n1 itself, so it only gets the id back.
//! assert_eq!(
//!     db.find("notes", "n1").unwrap(),
//!     Some(Cached::Reference("n1".to_string()))
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod cache;
mod config;
mod database;
mod error;
mod marshal;
mod query;
mod schema;
mod statement;
mod transaction;
mod types;

pub use batch::{parse_batch, BatchOperation, BatchSummary, CacheBehavior};
pub use cache::{validate_table_name, CacheKey, PresenceCache, KEY_SEPARATOR};
pub use config::Config;
pub use database::{Database, SharedDatabase};
pub use error::{CoreError, CoreResult};
pub use marshal::ID_COLUMN;
pub use schema::SchemaVersion;
pub use statement::{Statement, StatementCache, StatementCacheStats};
pub use transaction::{TransactionOutcome, TransactionState, TransactionStats};
pub use types::{ArrayQueryResult, Cached, Record, RecordArray};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
