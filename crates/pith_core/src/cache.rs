//! Record presence cache.
//!
//! Tracks which records have already been delivered to the host in full, so
//! later reads can answer with a bare id instead of the whole record.
//!
//! A key is present only if the record's full attribute set was delivered
//! in an earlier call *and* that delivery reflects committed data. The cache
//! is therefore only touched by successful reads and by batches after their
//! commit returns.

use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;
use std::fmt;

/// Separator between table name and record id in a [`CacheKey`].
pub const KEY_SEPARATOR: char = '$';

/// Identity of a record: table name and record id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for `id` in `table`.
    ///
    /// # Errors
    ///
    /// Fails if the table name is not a valid record table name (see
    /// [`validate_table_name`]); otherwise two distinct records could map to
    /// the same key.
    pub fn new(table: &str, id: &str) -> CoreResult<Self> {
        validate_table_name(table)?;
        Ok(Self::compose(table, id))
    }

    /// Builds a key for a table name already checked by
    /// [`validate_table_name`].
    pub(crate) fn compose(table: &str, id: &str) -> Self {
        let mut key = String::with_capacity(table.len() + id.len() + 1);
        key.push_str(table);
        key.push(KEY_SEPARATOR);
        key.push_str(id);
        Self(key)
    }

    /// Returns the composed key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks that `table` can be used as a record table name.
///
/// Names must be non-empty and must not contain the key separator or a
/// backtick (table names are quoted with backticks in generated SQL).
pub fn validate_table_name(table: &str) -> CoreResult<()> {
    if table.is_empty() {
        return Err(CoreError::contract_violation("Table name must not be empty"));
    }
    if table.contains(KEY_SEPARATOR) || table.contains('`') {
        return Err(CoreError::contract_violation(format!(
            "Invalid table name {table:?}: table names cannot contain '{KEY_SEPARATOR}' or '`'"
        )));
    }
    Ok(())
}

/// Set of records already delivered to the host.
#[derive(Debug, Default)]
pub struct PresenceCache {
    keys: HashSet<CacheKey>,
}

impl PresenceCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the record has been delivered in full.
    #[must_use]
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.keys.contains(key)
    }

    /// Marks the record as delivered.
    pub fn mark_as_cached(&mut self, key: CacheKey) {
        self.keys.insert(key);
    }

    /// Forgets the record.
    pub fn remove_from_cache(&mut self, key: &CacheKey) {
        self.keys.remove(key);
    }

    /// Forgets every record.
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates over cached keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.keys.iter()
    }
}
