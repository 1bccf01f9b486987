//! CLI command implementations.

pub mod backup;
pub mod data;
pub mod inspect;
pub mod tables;

use dotdb_core::{Config, Database};
use serde_json::Value;
use std::path::Path;

/// Opens the database for one command.
///
/// Missing directories are not created from the command line.
pub fn open(path: &Path, secret: String) -> Result<Database, Box<dyn std::error::Error>> {
    let config = Config::new(secret).create_if_missing(false);
    Ok(Database::open(path, config)?)
}

/// Parses a command-line value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
