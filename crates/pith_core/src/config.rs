//! Database configuration.

use std::time::Duration;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to switch the journal to write-ahead-log mode on open.
    pub wal_mode: bool,

    /// Whether to keep temporary tables and indices in memory.
    ///
    /// Needed on platforms where the engine cannot find a usable temp
    /// directory; large batches otherwise fail with an I/O error.
    pub temp_store_memory: bool,

    /// Initial capacity of the prepared-statement cache.
    ///
    /// The cache grows past this as new SQL texts appear; it never evicts.
    pub statement_cache_capacity: usize,

    /// How long to wait on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            wal_mode: true,
            temp_store_memory: false,
            statement_cache_capacity: 64,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to enable write-ahead-log mode.
    #[must_use]
    pub const fn wal_mode(mut self, value: bool) -> Self {
        self.wal_mode = value;
        self
    }

    /// Sets whether temporary storage lives in memory.
    #[must_use]
    pub const fn temp_store_memory(mut self, value: bool) -> Self {
        self.temp_store_memory = value;
        self
    }

    /// Sets the initial prepared-statement cache capacity.
    #[must_use]
    pub const fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    /// Sets the busy timeout.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }
}
