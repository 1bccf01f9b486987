//! File-based storage backend for persistent storage.

use crate::backend::DocumentBackend;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix of the sibling file a new document is staged in.
const TEMP_SUFFIX: &str = "tmp";
/// Suffix of the advisory lock file held while the backend is open.
const LOCK_SUFFIX: &str = "lock";

/// A file-based document backend.
///
/// The document lives in a single file. Writes go through a staging file
/// next to the target and are then renamed over it, so a reader sees either
/// the old document or the new one, never a mix.
///
/// ```text
/// <dir>/
/// ├─ data.json        # The document
/// ├─ data.json.tmp    # Staging file, only present during a write
/// └─ data.json.lock   # Advisory lock held while open
/// ```
///
/// # Thread Safety
///
/// Writes are serialized by a per-instance gate. The advisory lock makes
/// sure only one `FileBackend` per file exists at a time, so the gate is
/// enough to keep two writers off the staging file.
///
/// # Example
///
/// ```no_run
/// use dotdb_storage::{DocumentBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("data.json")).unwrap();
/// backend.write("{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    gate: Mutex<()>,
    _lock_file: File,
}

impl FileBackend {
    /// Opens a file backend at the given path.
    ///
    /// The document file itself is not created until the first write.
    ///
    /// # Errors
    ///
    /// Returns `Locked` if another backend holds the file, or an I/O error
    /// if the lock file cannot be created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let lock_path = sibling(path, LOCK_SUFFIX);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                name: file_name(path),
            });
        }

        debug!(file = %file_name(path), "opened file backend");

        Ok(Self {
            path: path.to_path_buf(),
            gate: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file is locked.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// Returns the path of the staging file used during writes.
    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        sibling(&self.path, TEMP_SUFFIX)
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_parent(&self) -> StorageResult<()> {
        // Directory fsync is not available on this platform.
        Ok(())
    }
}

impl DocumentBackend for FileBackend {
    fn read(&self) -> StorageResult<Option<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| StorageError::NotText)
    }

    fn write(&self, document: &str) -> StorageResult<()> {
        let _gate = self.gate.lock();
        let temp_path = self.temp_path();

        let mut file = File::create(&temp_path)?;
        file.write_all(document.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        self.sync_parent()?;

        debug!(file = %file_name(&self.path), bytes = document.len(), "document replaced");
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_none() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("db.json")).unwrap();
        assert!(backend.read().unwrap().is_none());
        assert!(!backend.exists());
    }

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let backend = FileBackend::open(&dir.path().join("db.json")).unwrap();
        backend.write("{\"k\":1}").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("{\"k\":1}"));
        assert!(!backend.temp_path().exists());
    }

    #[test]
    fn second_open_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        let _first = FileBackend::open(&path).unwrap();
        let second = FileBackend::open(&path);
        assert!(matches!(second, Err(StorageError::Locked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.json");
        drop(FileBackend::open(&path).unwrap());
        assert!(FileBackend::open(&path).is_ok());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("db.yaml");
        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        backend.write("a: 1\n").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn concurrent_writes_leave_a_whole_document() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(FileBackend::open(&dir.path().join("db.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = Arc::clone(&backend);
                thread::spawn(move || {
                    let doc = format!("{{\"writer\":{i}}}");
                    backend.write(&doc).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let doc = backend.read().unwrap().unwrap();
        assert!(doc.starts_with("{\"writer\":") && doc.ends_with('}'));
    }
}
