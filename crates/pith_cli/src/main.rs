//! PithDB CLI
//!
//! Command-line tools for operating on a PithDB database file.
//!
//! # Commands
//!
//! - `user-version` - Print the schema version
//! - `find`, `query`, `query-array`, `query-ids`, `raw`, `count`, `get-local` -
//!   Run reads and print the results as JSON
//! - `batch` - Run a batch file atomically
//! - `migrate` - Apply a migration script
//! - `reset` - Wipe the database and install a schema

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// PithDB command-line database tools.
#[derive(Parser)]
#[command(name = "pith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema version
    UserVersion,

    /// Fetch one record by id
    Find {
        /// Table name
        table: String,
        /// Record id
        id: String,
    },

    /// Run a cache-aware query returning dictionaries
    Query {
        /// Table the records live in
        table: String,
        /// SQL text; the first column must be `id`
        sql: String,
        /// Arguments as a JSON array
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Run a cache-aware query returning positional arrays
    QueryArray {
        /// Table the records live in
        table: String,
        /// SQL text; the first column must be `id`
        sql: String,
        /// Arguments as a JSON array
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Run a query and print only the ids
    QueryIds {
        /// SQL text; the first column must be `id`
        sql: String,
        /// Arguments as a JSON array
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Run any query and print full rows
    Raw {
        /// SQL text
        sql: String,
        /// Arguments as a JSON array
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Run a single-value count query
    Count {
        /// SQL text returning one row with one column
        sql: String,
        /// Arguments as a JSON array
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Read a value from local_storage
    GetLocal {
        /// Key to look up
        key: String,
    },

    /// Run a batch file (JSON) atomically
    Batch {
        /// File holding `[[cacheBehavior, table, sql, [[args]]], ...]`
        file: PathBuf,
    },

    /// Apply a migration script
    Migrate {
        /// SQL script to apply
        file: PathBuf,

        /// Version the database must be at
        #[arg(long)]
        from: i32,

        /// Version to record afterwards
        #[arg(long)]
        to: i32,
    },

    /// Wipe the database and install a schema
    Reset {
        /// SQL schema script
        schema: PathBuf,

        /// Version to record
        #[arg(long)]
        version: i32,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("PithDB CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("PithDB Core v{}", pith_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Database path required (--path)")?;
    let mut db = commands::open(&path)?;

    match cli.command {
        Commands::UserVersion => commands::schema::user_version(&mut db)?,
        Commands::Find { table, id } => commands::read::find(&mut db, &table, &id)?,
        Commands::Query { table, sql, args } => {
            commands::read::query(&mut db, &table, &sql, args.as_deref())?;
        }
        Commands::QueryArray { table, sql, args } => {
            commands::read::query_array(&mut db, &table, &sql, args.as_deref())?;
        }
        Commands::QueryIds { sql, args } => {
            commands::read::query_ids(&mut db, &sql, args.as_deref())?;
        }
        Commands::Raw { sql, args } => commands::read::raw(&mut db, &sql, args.as_deref())?,
        Commands::Count { sql, args } => commands::read::count(&mut db, &sql, args.as_deref())?,
        Commands::GetLocal { key } => commands::read::get_local(&mut db, &key)?,
        Commands::Batch { file } => commands::batch::run(&mut db, &file)?,
        Commands::Migrate { file, from, to } => {
            commands::schema::migrate(&mut db, &file, from, to)?;
        }
        Commands::Reset { schema, version } => {
            commands::schema::reset(&mut db, &schema, version)?;
        }
        Commands::Version => {}
    }

    db.close()?;
    Ok(())
}
