//! Test fixtures and database helpers.
//!
//! Every fixture database has the notes schema below installed at
//! [`SCHEMA_VERSION`].

use pith_core::{BatchOperation, CacheKey, Config, Database};
use pith_value::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Schema installed in every fixture database.
pub const NOTES_SCHEMA: &str = "
    create table notes (
        id text primary key,
        title text not null,
        body text,
        pinned integer not null default 0
    );
    create table local_storage (
        key text primary key,
        value text
    );
";

/// Version the fixture schema is installed at.
pub const SCHEMA_VERSION: i32 = 1;

/// Inserts (or replaces) a note; marks it as delivered.
pub const INSERT_NOTE: &str = "insert or replace into notes (id, title, body) values (?, ?, ?)";

/// Deletes a note; forgets it.
pub const DELETE_NOTE: &str = "delete from notes where id = ?";

/// Retitles a note; no cache effect.
pub const RETITLE_NOTE: &str = "update notes set title = ? where id = ?";

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
    path: Option<PathBuf>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        let mut db = Database::open_in_memory().expect("Failed to open in-memory database");
        install_schema(&mut db);
        Self {
            db,
            _temp_dir: None,
            path: None,
        }
    }

    /// Creates a new file-based test database.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-based test database with custom configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.pith");

        let mut db =
            Database::open_with_config(&path, config).expect("Failed to open file database");
        install_schema(&mut db);

        Self {
            db,
            _temp_dir: Some(temp_dir),
            path: Some(path),
        }
    }

    /// Returns the database path if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Closes the handle and opens a fresh one on the same file.
    ///
    /// The new handle starts with an empty presence cache.
    ///
    /// # Panics
    ///
    /// Panics for in-memory databases.
    pub fn reopen(self) -> Self {
        let path = self.path.clone().expect("Only file databases can be reopened");
        let config = self.db.config().clone();
        self.db.close().expect("Failed to close database");
        let db = Database::open_with_config(&path, config).expect("Failed to reopen database");
        Self {
            db,
            _temp_dir: self._temp_dir,
            path: Some(path),
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl std::ops::DerefMut for TestDatabase {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

fn install_schema(db: &mut Database) {
    db.unsafe_reset_database(NOTES_SCHEMA, SCHEMA_VERSION)
        .expect("Failed to install fixture schema");
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust,ignore
/// use pith_testkit::with_temp_db;
///
/// #[test]
/// fn my_test() {
///     with_temp_db(|db| {
///         assert_eq!(db.find("notes", "n1").unwrap(), None);
///     });
/// }
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&mut Database) -> R,
{
    let mut test_db = TestDatabase::memory();
    f(&mut test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&mut Database, &Path) -> R,
{
    let mut test_db = TestDatabase::file();
    let path = test_db
        .path()
        .expect("File database should have a path")
        .to_path_buf();
    f(&mut test_db.db, &path)
}

/// Batch operation inserting one note, marking it as delivered.
pub fn note_insert(id: &str, title: &str) -> BatchOperation {
    BatchOperation::insert("notes", INSERT_NOTE).with_args(note_args(id, title))
}

/// Batch operation deleting notes, forgetting them.
pub fn note_delete(ids: &[&str]) -> BatchOperation {
    ids.iter().fold(
        BatchOperation::delete("notes", DELETE_NOTE),
        |operation, id| operation.with_args(vec![Value::from(*id)]),
    )
}

/// Insert arguments for one note.
pub fn note_args(id: &str, title: &str) -> Vec<Value> {
    vec![Value::from(id), Value::from(title), Value::Null]
}

/// Snapshot of the presence cache, for before/after comparisons.
pub fn presence_snapshot(db: &Database) -> HashSet<CacheKey> {
    db.presence().keys().cloned().collect()
}

/// Number of rows in the notes table.
pub fn note_count(db: &mut Database) -> i64 {
    db.count("select count(*) from notes", &[])
        .expect("Failed to count notes")
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a database with notes `seed0..seed{count}` that the host has
    /// not seen yet (nothing is cached).
    pub fn seeded_database(count: usize) -> TestDatabase {
        let mut test_db = TestDatabase::memory();
        seed_notes(&mut test_db.db, count);
        test_db
    }

    /// Inserts `count` notes without touching the presence cache.
    pub fn seed_notes(db: &mut Database, count: usize) {
        let operation = (0..count).fold(BatchOperation::execute(INSERT_NOTE), |op, i| {
            op.with_args(note_args(&format!("seed{i}"), &format!("Seed {i}")))
        });
        db.batch(&[operation]).expect("Failed to seed notes");
    }
}
