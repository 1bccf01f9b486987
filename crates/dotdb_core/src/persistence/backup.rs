//! Timestamped backups with retention.
//!
//! Backups are plain (decoded) documents written next to the database:
//!
//! ```text
//! <db dir>/
//! ├─ data.json
//! └─ backups/
//!    ├─ backup-2026-10-17T09-14-03-512904Z.json
//!    └─ backup-2026-10-17T09-20-41-003117Z.json
//! ```
//!
//! The stamp is fixed-width UTC, so sorting names sorts by time.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Duration, Utc};
use dotdb_codec::{codec_for, Document, Format};
use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the backups subdirectory.
pub const BACKUP_DIR: &str = "backups";
/// File name prefix of every backup.
pub const BACKUP_PREFIX: &str = "backup-";

const STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%6fZ";

/// Creates, lists, prunes, and reads backups in one directory.
///
/// Creation and pruning run under one lock, so an explicit backup and the
/// background one never prune each other's files mid-write.
#[derive(Debug)]
pub struct BackupManager {
    dir: PathBuf,
    format: Format,
    pretty: bool,
    max_backups: usize,
    lock: Mutex<()>,
}

impl BackupManager {
    /// Creates a manager for `<database dir>/backups`.
    #[must_use]
    pub fn for_database(database: &Path, format: Format, pretty: bool, max_backups: usize) -> Self {
        let parent = database.parent().unwrap_or_else(|| Path::new(""));
        Self::new(parent.join(BACKUP_DIR), format, pretty, max_backups)
    }

    /// Creates a manager for an explicit directory.
    #[must_use]
    pub fn new(dir: PathBuf, format: Format, pretty: bool, max_backups: usize) -> Self {
        Self {
            dir,
            format,
            pretty,
            max_backups,
            lock: Mutex::new(()),
        }
    }

    /// The backups directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `document` to a new backup file and prunes old ones.
    ///
    /// Returns the new file's path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or file cannot be written, or
    /// a codec error if encoding fails.
    pub fn create(&self, document: &Document) -> CoreResult<PathBuf> {
        let _guard = self.lock.lock();
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::io(e, &self.dir))?;

        let text = codec_for(self.format, self.pretty).encode(document)?;
        let path = self.next_path(Utc::now());
        let staging = path.with_extension(format!("{}.tmp", self.format.extension()));
        write_synced(&staging, &text)?;
        fs::rename(&staging, &path).map_err(|e| CoreError::io(e, &path))?;

        info!(file = %display_name(&path), keys = document.len(), "created backup");
        self.prune_locked()?;
        Ok(path)
    }

    /// Backup files, newest first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be read.
    pub fn list(&self) -> CoreResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CoreError::io(e, &self.dir)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::io(e, &self.dir))?;
            let path = entry.path();
            if is_backup_file(&path) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(files)
    }

    /// Deletes backups beyond the retention count; returns how many went.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be read.
    pub fn prune(&self) -> CoreResult<usize> {
        let _guard = self.lock.lock();
        self.prune_locked()
    }

    /// Resolves a backup reference: a path, or a bare file name inside the
    /// backups directory.
    #[must_use]
    pub fn resolve(&self, backup: &Path) -> PathBuf {
        let bare = backup.parent().map_or(true, |p| p.as_os_str().is_empty());
        if bare && !backup.exists() {
            self.dir.join(backup)
        } else {
            backup.to_path_buf()
        }
    }

    /// Reads a backup written in the active format.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the file's extension names a different
    /// format, `NotFound` if it does not exist, or a codec error if it
    /// cannot be parsed.
    pub fn read(&self, backup: &Path) -> CoreResult<Document> {
        let path = self.resolve(backup);
        let format = Format::from_path(&path)?;
        if format != self.format {
            return Err(CoreError::validation(format!(
                "backup {} is {format}, but the database uses {}",
                display_name(&path),
                self.format
            )));
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CoreError::not_found(format!("backup {}", display_name(&path))))
            }
            Err(e) => return Err(CoreError::io(e, &path)),
        };
        Ok(codec_for(self.format, self.pretty).decode(&text)?)
    }

    fn next_path(&self, now: DateTime<Utc>) -> PathBuf {
        let mut stamp = now;
        loop {
            let path = self.dir.join(format!(
                "{BACKUP_PREFIX}{}.{}",
                stamp.format(STAMP_FORMAT),
                self.format.extension()
            ));
            if !path.exists() {
                return path;
            }
            stamp += Duration::microseconds(1);
        }
    }

    fn prune_locked(&self) -> CoreResult<usize> {
        if self.max_backups == 0 {
            return Ok(0);
        }
        let mut removed = 0;
        for stale in self.list()?.into_iter().skip(self.max_backups) {
            match fs::remove_file(&stale) {
                Ok(()) => {
                    removed += 1;
                    debug!(file = %display_name(&stale), "pruned backup");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(file = %display_name(&stale), error = %e, "could not prune backup"),
            }
        }
        Ok(removed)
    }
}

fn write_synced(path: &Path, text: &str) -> CoreResult<()> {
    let mut file = fs::File::create(path).map_err(|e| CoreError::io(e, path))?;
    file.write_all(text.as_bytes())
        .map_err(|e| CoreError::io(e, path))?;
    file.sync_all().map_err(|e| CoreError::io(e, path))
}

fn is_backup_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(BACKUP_PREFIX)
        && !name.ends_with(".tmp")
        && Format::from_path(path).is_ok()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn doc(n: i64) -> Document {
        json!({"n": n}).as_object().cloned().unwrap()
    }

    #[test]
    fn file_names_sort_by_time() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf(), Format::Json, true, 0);
        let t = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let name = manager.next_path(t);
        assert_eq!(
            name.file_name().unwrap().to_str().unwrap(),
            "backup-2026-01-02T03-04-05-000000Z.json"
        );
    }

    #[test]
    fn colliding_stamp_is_bumped() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf(), Format::Json, true, 0);
        let t = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        fs::write(manager.next_path(t), "{}").unwrap();
        let next = manager.next_path(t);
        assert!(next.to_str().unwrap().ends_with("05-000001Z.json"));
    }

    #[test]
    fn retention_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join(BACKUP_DIR), Format::Json, true, 3);
        let mut created = Vec::new();
        for n in 0..5 {
            created.push(manager.create(&doc(n)).unwrap());
        }
        let listed = manager.list().unwrap();
        assert_eq!(listed.len(), 3);
        let newest: Vec<_> = created.iter().rev().take(3).cloned().collect();
        assert_eq!(listed, newest);
        assert_eq!(manager.read(&listed[0]).unwrap(), doc(4));
    }

    #[test]
    fn zero_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf(), Format::Yaml, true, 0);
        for n in 0..4 {
            manager.create(&doc(n)).unwrap();
        }
        assert_eq!(manager.list().unwrap().len(), 4);
        assert_eq!(manager.prune().unwrap(), 0);
    }

    #[test]
    fn read_rejects_other_format() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = BackupManager::new(dir.path().to_path_buf(), Format::Yaml, true, 0);
        let path = yaml.create(&doc(1)).unwrap();
        let json = BackupManager::new(dir.path().to_path_buf(), Format::Json, true, 0);
        assert!(json.read(&path).unwrap_err().is_validation());
    }

    #[test]
    fn resolves_bare_names() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf(), Format::Json, true, 0);
        let path = manager.create(&doc(7)).unwrap();
        let name = path.file_name().unwrap();
        assert_eq!(manager.read(Path::new(name)).unwrap(), doc(7));
        assert!(manager
            .read(Path::new("backup-1999-01-01T00-00-00-000000Z.json"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("nope"), Format::Json, true, 2);
        assert!(manager.list().unwrap().is_empty());
    }
}
