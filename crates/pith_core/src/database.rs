//! Database handle.

use crate::cache::{CacheKey, PresenceCache};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::statement::{StatementCache, StatementCacheStats};
use crate::transaction::{
    TransactionManager, TransactionOutcome, TransactionState, TransactionStats,
};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A database handle shared between threads.
///
/// The handle itself is single-threaded; every operation runs with the
/// lock held, which serializes access the way the engine expects.
pub type SharedDatabase = Arc<Mutex<Database>>;

/// The main database handle.
///
/// `Database` owns one engine connection together with its statement cache,
/// its record presence cache and its transaction state. It provides:
/// - Cache-aware reads (`find`, `query`, `query_as_array`)
/// - Plain reads (`query_ids`, `unsafe_query_raw`, `count`, `get_local`)
/// - Atomic batched writes (`batch`)
/// - Schema versioning (`migrate`, `unsafe_reset_database`)
///
/// # Opening a Database
///
/// ```rust,ignore
/// use pith_core::Database;
/// use std::path::Path;
///
/// let mut db = Database::open(Path::new("app.db"))?;
/// let note = db.find("notes", "n1")?;
/// db.close()?;
/// ```
///
/// # In-Memory Databases
///
/// For testing, use `Database::open_in_memory()`:
///
/// ```rust,ignore
/// let mut db = Database::open_in_memory()?;
/// ```
pub struct Database {
    /// Configuration.
    config: Config,
    /// Database file. None for in-memory databases.
    path: Option<PathBuf>,
    /// Engine connection.
    pub(crate) conn: Connection,
    /// Compiled statements, keyed by SQL text.
    pub(crate) statements: StatementCache,
    /// Records already delivered to the host.
    pub(crate) presence: PresenceCache,
    /// Open transaction, if any.
    pub(crate) transactions: TransactionManager,
}

impl Database {
    /// Opens a database file with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the file cannot be opened or configured.
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database file with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use pith_core::{Config, Database};
    /// use std::path::Path;
    ///
    /// let config = Config::default().temp_store_memory(true);
    /// let db = Database::open_with_config(Path::new("app.db"), config)?;
    /// ```
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        let mut flags = OpenFlags::default();
        if !config.create_if_missing {
            flags.remove(OpenFlags::SQLITE_OPEN_CREATE);
        }

        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| CoreError::engine("Failed to open database", &e))?;
        tracing::info!(path = %path.display(), "opened database");

        Self::from_connection(conn, config, Some(path.to_path_buf()))
    }

    /// Opens a fresh in-memory database with default configuration.
    ///
    /// Data is lost when the handle is closed.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_in_memory_with_config(Config::default())
    }

    /// Opens a fresh in-memory database with custom configuration.
    ///
    /// `wal_mode` has no effect on in-memory databases.
    pub fn open_in_memory_with_config(config: Config) -> CoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::engine("Failed to open database", &e))?;
        Self::from_connection(conn, config, None)
    }

    fn from_connection(
        conn: Connection,
        config: Config,
        path: Option<PathBuf>,
    ) -> CoreResult<Self> {
        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| CoreError::engine("Failed to set busy timeout", &e))?;

        if config.temp_store_memory {
            conn.execute_batch("pragma temp_store = memory")
                .map_err(|e| CoreError::engine("Failed to set temp_store", &e))?;
        }

        if config.wal_mode && path.is_some() {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "wal", |row| row.get(0))
                .map_err(|e| CoreError::engine("Failed to set journal_mode", &e))?;
            if !mode.eq_ignore_ascii_case("wal") {
                tracing::warn!(mode, "engine refused write-ahead-log mode");
            }
        }

        let statements = StatementCache::new(&conn, config.statement_cache_capacity);
        Ok(Self {
            config,
            path,
            conn,
            statements,
            presence: PresenceCache::new(),
            transactions: TransactionManager::new(),
        })
    }

    /// Closes the handle.
    ///
    /// An open transaction is rolled back and every cached statement is
    /// finalized before the connection closes.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the connection refuses to close.
    pub fn close(mut self) -> CoreResult<()> {
        if self.transactions.state().is_active() {
            self.transactions.rollback(&self.conn, &mut self.statements);
        }
        self.statements.finalize_all(&self.conn);
        self.conn
            .close()
            .map_err(|(_, e)| CoreError::engine("Failed to close database", &e))?;
        tracing::info!("closed database");
        Ok(())
    }

    /// Wraps the handle for use from several threads.
    #[must_use]
    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database file path, or `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the record presence cache.
    #[must_use]
    pub fn presence(&self) -> &PresenceCache {
        &self.presence
    }

    /// Returns true if the record has already been delivered in full.
    pub fn is_cached(&self, table: &str, id: &str) -> CoreResult<bool> {
        Ok(self.presence.is_cached(&CacheKey::new(table, id)?))
    }

    /// Returns statement cache statistics.
    #[must_use]
    pub fn statement_stats(&self) -> StatementCacheStats {
        self.statements.stats()
    }

    /// Returns the transaction state.
    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        self.transactions.state()
    }

    /// Returns how the last finished transaction ended.
    #[must_use]
    pub fn last_transaction_outcome(&self) -> Option<TransactionOutcome> {
        self.transactions.last_outcome()
    }

    /// Returns transaction counters.
    #[must_use]
    pub fn transaction_stats(&self) -> TransactionStats {
        self.transactions.stats()
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Opens an exclusive transaction.
    ///
    /// # Errors
    ///
    /// Fails if a transaction is already open or the engine refuses.
    pub fn begin_transaction(&mut self) -> CoreResult<()> {
        self.transactions.begin(&self.conn, &mut self.statements)
    }

    /// Commits the open transaction.
    ///
    /// On failure the transaction stays open and must be rolled back.
    pub fn commit(&mut self) -> CoreResult<()> {
        self.transactions.commit(&self.conn, &mut self.statements)
    }

    /// Rolls back the open transaction. Failures are logged, not returned.
    pub fn rollback(&mut self) {
        self.transactions.rollback(&self.conn, &mut self.statements);
    }

    /// Runs `f` inside an exclusive transaction.
    ///
    /// Commits if `f` succeeds. If `f` or the commit fails, rolls back and
    /// returns the original error. If the transaction cannot be begun,
    /// nothing is rolled back.
    pub fn in_transaction<F, T>(&mut self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Self) -> CoreResult<T>,
    {
        self.begin_transaction()?;
        let result = f(&mut *self).and_then(|value| self.commit().map(|()| value));
        if result.is_err() {
            self.rollback();
        }
        result
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("cached_records", &self.presence.len())
            .field("statements", &self.statements.len())
            .field("transaction", &self.transactions.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pith_value::Value;

    fn create_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.execute_multiple("create table notes (id text primary key, title text);")
            .unwrap();
        db
    }

    #[test]
    fn open_in_memory() {
        let db = create_db();
        assert!(db.path().is_none());
        assert!(db.presence().is_empty());
        assert_eq!(db.transaction_state(), TransactionState::Idle);
    }

    #[test]
    fn open_file_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");

        let mut db = Database::open(&path).unwrap();
        let rows = db.unsafe_query_raw("pragma journal_mode", &[]).unwrap();

        assert_eq!(rows[0].get("journal_mode"), Some(&Value::from("wal")));
        assert_eq!(db.path(), Some(path.as_path()));
        db.close().unwrap();
    }

    #[test]
    fn open_missing_without_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");

        let err = Database::open_with_config(&path, Config::new().create_if_missing(false))
            .unwrap_err();

        assert!(err.is_engine());
        assert!(!path.exists());
    }

    #[test]
    fn temp_store_option_is_applied() {
        let mut db =
            Database::open_in_memory_with_config(Config::new().temp_store_memory(true)).unwrap();
        assert_eq!(db.count("pragma temp_store", &[]).unwrap(), 2);
    }

    #[test]
    fn in_transaction_commits_on_success() {
        let mut db = create_db();

        db.in_transaction(|db| db.execute_multiple("insert into notes values ('a', 'A')"))
            .unwrap();

        assert_eq!(db.last_transaction_outcome(), Some(TransactionOutcome::Committed));
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 1);
    }

    #[test]
    fn in_transaction_rolls_back_on_error() {
        let mut db = create_db();

        let err = db
            .in_transaction(|db| {
                db.execute_multiple("insert into notes values ('a', 'A')")?;
                Err::<(), _>(CoreError::contract_violation("stop"))
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "stop");
        assert_eq!(db.last_transaction_outcome(), Some(TransactionOutcome::RolledBack));
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 0);
    }

    #[test]
    fn nested_transaction_is_rejected_without_rollback() {
        let mut db = create_db();
        db.begin_transaction().unwrap();

        let err = db.in_transaction(|_| Ok(())).unwrap_err();

        assert!(matches!(err, CoreError::InvalidOperation { .. }));
        assert_eq!(db.transaction_state(), TransactionState::Active);
        db.rollback();
    }

    #[test]
    fn close_rolls_back_open_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.execute_multiple("create table notes (id text primary key);")
                .unwrap();
            db.begin_transaction().unwrap();
            db.execute_multiple("insert into notes values ('a')").unwrap();
            db.close().unwrap();
        }

        let mut db = Database::open(&path).unwrap();
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 0);
    }

    #[test]
    fn shared_handle_serializes_access() {
        let shared = create_db().into_shared();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let mut db = db.lock();
                    db.batch(&[crate::batch::BatchOperation::insert(
                        "notes",
                        "insert into notes values (?, ?)",
                    )
                    .with_args(vec![Value::from(format!("n{i}")), Value::from("T")])])
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut db = shared.lock();
        assert_eq!(db.count("select count(*) from notes", &[]).unwrap(), 4);
        assert_eq!(db.presence().len(), 4);
    }
}
