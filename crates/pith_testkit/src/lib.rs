//! # PithDB Testkit
//!
//! Test utilities for PithDB.
//!
//! This crate provides:
//! - Test fixtures: databases with a small notes schema installed
//! - Property-based test generators for batches using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pith_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     with_temp_db(|db| {
//!         db.batch(&[note_insert("n1", "Groceries")]).unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
