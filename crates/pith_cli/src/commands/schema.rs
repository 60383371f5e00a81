//! Schema commands.

use super::read_file;
use pith_core::{Database, SchemaVersion};
use std::path::Path;
use tracing::info;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Prints the schema version.
pub fn user_version(db: &mut Database) -> CommandResult {
    println!("{}", db.get_user_version()?);
    Ok(())
}

/// Applies the migration script in `file`.
pub fn migrate(
    db: &mut Database,
    file: &Path,
    from: SchemaVersion,
    to: SchemaVersion,
) -> CommandResult {
    let script = read_file(file)?;
    db.migrate(&script, from, to)?;
    info!("Migrated {:?} from v{} to v{}", db.path(), from, to);
    println!("{to}");
    Ok(())
}

/// Wipes the database and installs the schema in `file`.
pub fn reset(db: &mut Database, file: &Path, version: SchemaVersion) -> CommandResult {
    let schema = read_file(file)?;
    db.unsafe_reset_database(&schema, version)?;
    println!("{version}");
    Ok(())
}
