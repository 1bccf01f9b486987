//! Path-based key/value commands.

use super::parse_value;
use dotdb_core::Database;
use tracing::info;

/// Prints the value at `key` as pretty JSON.
pub fn get(db: &Database, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    match db.get(key)? {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => return Err(format!("No value at {key:?}").into()),
    }
    Ok(())
}

/// Stores `raw` (JSON, or a plain string) at `key`.
pub fn set(db: &Database, key: &str, raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    let value = parse_value(raw);
    info!("Setting {key}");
    db.set(key, value)?;
    println!("✓ Stored {key}");
    Ok(())
}

/// Deletes the value at `key`.
pub fn delete(db: &Database, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db.delete(key)? {
        println!("✓ Deleted {key}");
    } else {
        println!("Nothing stored at {key}");
    }
    Ok(())
}
