//! DotDB CLI
//!
//! Command-line front end for DotDB database files.
//!
//! # Commands
//!
//! - `get` / `set` / `delete` - Path-based key/value access
//! - `tables` / `describe` / `query` - Table inspection and queries
//! - `backup` / `backups` / `restore` - Backup management
//! - `export` / `info` - Format conversion and statistics

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DotDB command-line database tools.
#[derive(Parser)]
#[command(name = "dotdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file (.json, .yaml, or .sql)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Secret the value key is derived from
    #[arg(global = true, short, long, env = "DOTDB_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value at a dotted path
    Get {
        /// Dotted path, e.g. `settings.theme`
        key: String,
    },

    /// Store a value at a dotted path
    Set {
        /// Dotted path
        key: String,

        /// Value, parsed as JSON with a plain-string fallback
        value: String,
    },

    /// Delete the value at a dotted path
    Delete {
        /// Dotted path
        key: String,
    },

    /// List tables and their row counts
    Tables,

    /// Show a table's schema
    Describe {
        /// Table name
        table: String,
    },

    /// Query a table
    Query {
        /// Table name
        table: String,

        /// Filter as JSON, e.g. `{"age": {"$gt": 25}}`
        #[arg(short, long = "where")]
        filter: Option<String>,

        /// Ordering, e.g. `age desc`
        #[arg(short, long)]
        order: Option<String>,

        /// Rows to skip
        #[arg(long)]
        offset: Option<usize>,

        /// Maximum rows to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Comma-separated columns to keep
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
    },

    /// Create a backup next to the database file
    Backup,

    /// List backups, newest first
    Backups,

    /// Restore a backup (path or file name from `backups`)
    Restore {
        /// Backup path or file name
        backup: PathBuf,

        /// Clear the database first instead of merging
        #[arg(long)]
        replace: bool,
    },

    /// Print the stored tree in another format
    Export {
        /// Output format (json, yaml, sql)
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display database statistics and metadata
    Info {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
        println!("DotDB CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("DotDB Core v{}", dotdb_core::VERSION);
        return Ok(());
    }

    let path = cli.path.ok_or("Database path required (--path)")?;
    let secret = cli
        .secret
        .ok_or("Secret required (--secret or DOTDB_SECRET)")?;
    let db = commands::open(&path, secret)?;

    match cli.command {
        Commands::Get { key } => commands::data::get(&db, &key)?,
        Commands::Set { key, value } => commands::data::set(&db, &key, &value)?,
        Commands::Delete { key } => commands::data::delete(&db, &key)?,
        Commands::Tables => commands::tables::list(&db)?,
        Commands::Describe { table } => commands::tables::describe(&db, &table)?,
        Commands::Query {
            table,
            filter,
            order,
            offset,
            limit,
            select,
        } => {
            let options = commands::tables::QueryOptions {
                filter,
                order,
                offset,
                limit,
                select,
            };
            commands::tables::query(&db, &table, &options)?;
        }
        Commands::Backup => commands::backup::create(&db)?,
        Commands::Backups => commands::backup::list(&db)?,
        Commands::Restore { backup, replace } => commands::backup::restore(&db, &backup, replace)?,
        Commands::Export { format, output } => {
            commands::inspect::export(&db, &format, output.as_deref())?;
        }
        Commands::Info { format } => commands::inspect::info(&db, &format)?,
        Commands::Version => {}
    }

    db.close()?;
    Ok(())
}
