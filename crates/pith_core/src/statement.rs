//! Prepared-statement cache.
//!
//! Maps exact SQL text to a compiled statement so that repeated calls never
//! re-parse SQL. The handles themselves live in the connection's statement
//! LRU; this cache registers every distinct text it has compiled and keeps
//! the LRU large enough that nothing is ever evicted. The set of distinct
//! texts issued by the record layer is small and bounded, so growth is fine.
//!
//! A handle is lent out as a [`Statement`] guard. When the guard goes out of
//! scope, on success or on an error path alike, its step position is reset,
//! its bindings are cleared and it returns to the cache.

use crate::error::{CoreError, CoreResult};
use rusqlite::Connection;
use std::collections::HashSet;

/// A cached statement lent out for one use.
pub type Statement<'conn> = rusqlite::CachedStatement<'conn>;

/// Hit/miss counters for the statement cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementCacheStats {
    /// Number of distinct SQL texts compiled.
    pub statements: usize,
    /// Lookups served by an already compiled statement.
    pub hits: u64,
    /// Lookups that compiled a new statement.
    pub misses: u64,
}

/// Fetch-or-prepare cache keyed by SQL text.
#[derive(Debug)]
pub struct StatementCache {
    /// Every SQL text compiled so far.
    known: HashSet<String>,
    /// Current capacity of the connection's statement LRU.
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl StatementCache {
    /// Creates a cache and sizes the connection's LRU to `capacity`.
    pub fn new(conn: &Connection, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        conn.set_prepared_statement_cache_capacity(capacity);
        Self {
            known: HashSet::new(),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the compiled statement for `sql`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns an engine error if SQLite rejects the text. A failed compile
    /// leaves nothing behind in the cache.
    pub fn prepare<'conn>(
        &mut self,
        conn: &'conn Connection,
        sql: &str,
    ) -> CoreResult<Statement<'conn>> {
        if self.known.contains(sql) {
            self.hits += 1;
        } else {
            self.reserve_slot(conn);
        }

        let statement = conn
            .prepare_cached(sql)
            .map_err(|e| CoreError::engine("Failed to prepare query statement", &e))?;

        if self.known.insert(sql.to_string()) {
            self.misses += 1;
            tracing::debug!(statements = self.known.len(), "compiled new statement: {sql}");
        }
        Ok(statement)
    }

    /// Makes room for one more entry so the LRU never evicts.
    fn reserve_slot(&mut self, conn: &Connection) {
        if self.known.len() < self.capacity {
            return;
        }
        self.capacity *= 2;
        conn.set_prepared_statement_cache_capacity(self.capacity);
        tracing::debug!(capacity = self.capacity, "grew statement cache");
    }

    /// Returns true if `sql` has been compiled.
    #[must_use]
    pub fn contains(&self, sql: &str) -> bool {
        self.known.contains(sql)
    }

    /// Returns the number of distinct statements compiled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns true if nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Returns hit/miss statistics.
    #[must_use]
    pub fn stats(&self) -> StatementCacheStats {
        StatementCacheStats {
            statements: self.known.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Finalizes every cached statement.
    ///
    /// Only called when the owning handle is torn down.
    pub(crate) fn finalize_all(&mut self, conn: &Connection) {
        conn.flush_prepared_statement_cache();
        self.known.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Connection, StatementCache) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table t (id text primary key, n integer);")
            .unwrap();
        let cache = StatementCache::new(&conn, 2);
        (conn, cache)
    }

    #[test]
    fn second_prepare_is_a_hit() {
        let (conn, mut cache) = setup();

        drop(cache.prepare(&conn, "select * from t").unwrap());
        drop(cache.prepare(&conn, "select * from t").unwrap());

        let stats = cache.stats();
        assert_eq!(stats.statements, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn compile_failure_is_an_engine_error() {
        let (conn, mut cache) = setup();

        let Err(err) = cache.prepare(&conn, "select * from missing") else {
            panic!("compiling against a missing table should fail");
        };

        assert!(err.is_engine());
        assert!(err
            .to_string()
            .starts_with("Failed to prepare query statement - sqlite error 1"));
        assert!(!cache.contains("select * from missing"));
        assert!(cache.is_empty());
    }

    #[test]
    fn grows_instead_of_evicting() {
        let (conn, mut cache) = setup();
        let texts: Vec<String> = (0..10).map(|i| format!("select {i} from t")).collect();

        for sql in &texts {
            drop(cache.prepare(&conn, sql).unwrap());
        }
        for sql in &texts {
            drop(cache.prepare(&conn, sql).unwrap());
        }

        let stats = cache.stats();
        assert_eq!(stats.statements, 10);
        assert_eq!(stats.misses, 10);
        assert_eq!(stats.hits, 10);
        assert!(cache.capacity >= 10);
    }

    #[test]
    fn returned_statement_is_reset() {
        let (conn, mut cache) = setup();
        conn.execute_batch("insert into t values ('a', 1), ('b', 2);")
            .unwrap();

        {
            let mut stmt = cache.prepare(&conn, "select id from t order by id").unwrap();
            let mut rows = stmt.raw_query();
            let first = rows.next().unwrap().unwrap();
            assert_eq!(first.get::<_, String>(0).unwrap(), "a");
            // dropped mid-iteration
        }

        let mut stmt = cache.prepare(&conn, "select id from t order by id").unwrap();
        let mut rows = stmt.raw_query();
        let first = rows.next().unwrap().unwrap();
        assert_eq!(first.get::<_, String>(0).unwrap(), "a");
    }

    #[test]
    fn finalize_all_forgets_statements() {
        let (conn, mut cache) = setup();
        drop(cache.prepare(&conn, "select * from t").unwrap());

        cache.finalize_all(&conn);

        assert!(cache.is_empty());
    }
}
