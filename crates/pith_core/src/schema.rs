//! Schema version control.
//!
//! The schema version lives in the engine's `user_version` header field.
//! Both reset and migration apply their script and the new version in the
//! same transaction, so the version never disagrees with the schema.

use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::marshal::column_integer;
use crate::query::{execute_query, execute_update};
use rusqlite::config::DbConfig;

/// A schema version as stored in the database header.
pub type SchemaVersion = i32;

impl Database {
    /// Reads the schema version.
    pub fn get_user_version(&mut self) -> CoreResult<SchemaVersion> {
        let mut statement =
            execute_query(&self.conn, &mut self.statements, "pragma user_version", &[])?;
        let mut rows = statement.raw_query();
        let row = rows
            .next()
            .map_err(|e| CoreError::engine("Failed to get a row for query", &e))?
            .ok_or_else(|| CoreError::contract_violation("user_version returned no rows"))?;
        let version = column_integer(row, 0)?;
        SchemaVersion::try_from(version).map_err(|_| {
            CoreError::consistency_failure(format!("user_version {version} is out of range"))
        })
    }

    /// Writes the schema version.
    pub fn set_user_version(&mut self, version: SchemaVersion) -> CoreResult<()> {
        let sql = format!("pragma user_version = {version}");
        execute_update(&self.conn, &mut self.statements, &sql, &[])?;
        Ok(())
    }

    /// Destroys every table and row, then installs `schema` at `version`.
    ///
    /// The presence cache is emptied before anything else happens, so no
    /// outcome of this call leaves references to records that may no longer
    /// exist. The wipe itself is not transactional; installing the new
    /// schema is.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error inside an open transaction, and
    /// the engine error of whichever step failed otherwise.
    pub fn unsafe_reset_database(
        &mut self,
        schema: &str,
        version: SchemaVersion,
    ) -> CoreResult<()> {
        self.transactions.ensure_idle()?;
        tracing::warn!(version, "resetting database");

        self.presence.clear();
        self.wipe()?;

        self.in_transaction(|db| {
            db.execute_multiple(schema)?;
            db.set_user_version(version)
        })?;

        tracing::info!(version, "database reset");
        Ok(())
    }

    /// Clears the database file with the engine's reset mode and a vacuum.
    fn wipe(&mut self) -> CoreResult<()> {
        self.set_reset_mode(true)?;
        let vacuum = self.execute_multiple("vacuum");
        let restore = self.set_reset_mode(false);
        vacuum.and(restore)
    }

    fn set_reset_mode(&self, enabled: bool) -> CoreResult<()> {
        self.conn
            .set_db_config(DbConfig::SQLITE_DBCONFIG_RESET_DATABASE, enabled)
            .map(|_| ())
            .map_err(|e| {
                let action = if enabled { "enable" } else { "disable" };
                CoreError::engine(format!("Failed to {action} reset database mode"), &e)
            })
    }

    /// Applies `migration` to a database at version `from`, leaving it at
    /// version `to`.
    ///
    /// The presence cache is left alone: migrations are expected to keep
    /// existing records intact.
    ///
    /// # Errors
    ///
    /// Returns a consistency failure if the database is not at `from`. The
    /// transaction is rolled back on any failure.
    pub fn migrate(
        &mut self,
        migration: &str,
        from: SchemaVersion,
        to: SchemaVersion,
    ) -> CoreResult<()> {
        tracing::info!(from, to, "migrating database");

        self.in_transaction(|db| {
            let current = db.get_user_version()?;
            if current != from {
                return Err(CoreError::consistency_failure(format!(
                    "Incompatible migration set applied. DB: {current}, migration: {from}"
                )));
            }
            db.execute_multiple(migration)?;
            db.set_user_version(to)
        })?;

        tracing::info!(version = to, "migration complete");
        Ok(())
    }
}
