//! CLI command implementations.

pub mod batch;
pub mod read;
pub mod schema;

use pith_core::Database;
use pith_value::Value;
use std::path::Path;
use thiserror::Error;

/// Errors in command-line input.
#[derive(Debug, Error)]
pub enum CliError {
    /// `--args` was not a JSON array.
    #[error("--args must be a JSON array, got {0}")]
    ArgsNotArray(String),

    /// A file given on the command line could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Opens the database at `path`.
pub fn open(path: &Path) -> Result<Database, Box<dyn std::error::Error>> {
    Ok(Database::open(path)?)
}

/// Parses the `--args` option into query arguments.
pub fn parse_args(args: Option<&str>) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let Some(text) = args else {
        return Ok(Vec::new());
    };
    match pith_value::from_json(text)? {
        Value::Array(values) => Ok(values),
        other => Err(CliError::ArgsNotArray(other.kind().to_string()).into()),
    }
}

/// Reads a script or batch file.
pub fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

/// Prints a host value as pretty JSON.
pub fn print_value(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", pith_value::to_json_pretty(value)?);
    Ok(())
}
