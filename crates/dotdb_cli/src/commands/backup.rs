//! Backup and restore commands.
//!
//! Backups live in a `backups` directory next to the database file and
//! hold decrypted values, so they survive a change of secret.

use dotdb_core::Database;
use std::path::Path;
use tracing::info;

/// Creates a backup.
pub fn create(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let path = db.backup()?;
    println!("✓ Backup created successfully");
    println!("  Path: {}", path.display());
    Ok(())
}

/// Lists backups, newest first.
pub fn list(db: &Database) -> Result<(), Box<dyn std::error::Error>> {
    let backups = db.list_backups()?;
    if backups.is_empty() {
        println!("No backups");
        return Ok(());
    }
    for path in backups {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{name}  ({size} bytes)");
    }
    Ok(())
}

/// Restores a backup, merging by top-level key unless `replace` is set.
pub fn restore(
    db: &Database,
    backup: &Path,
    replace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Restoring database from {:?}", backup);
    if replace {
        db.clear()?;
    }
    let keys = db.restore_from_backup(backup)?;
    println!("✓ Database restored successfully");
    println!("  Keys restored: {keys}");
    Ok(())
}
