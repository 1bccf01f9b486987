//! Loading and saving the whole document.
//!
//! ```text
//! Unloaded ──load──▶ Ready ──save──▶ Ready
//! ```
//!
//! The backend owns atomic replacement and the per-file write gate; this
//! layer only picks the format codec and maps errors.

mod backup;

pub use backup::{BackupManager, BACKUP_DIR, BACKUP_PREFIX};

use crate::error::{CoreError, CoreResult};
use dotdb_codec::{codec_for, Document, Format, FormatCodec};
use dotdb_storage::{DocumentBackend, StorageError};
use std::path::Path;
use tracing::{debug, info};

/// Reads and writes the document through one backend in one format.
pub struct Persistence {
    backend: Box<dyn DocumentBackend>,
    codec: Box<dyn FormatCodec>,
}

impl Persistence {
    /// Creates a persistence manager.
    #[must_use]
    pub fn new(backend: Box<dyn DocumentBackend>, format: Format, pretty: bool) -> Self {
        Self {
            backend,
            codec: codec_for(format, pretty),
        }
    }

    /// The on-disk format.
    #[must_use]
    pub fn format(&self) -> Format {
        self.codec.format()
    }

    /// The file behind the backend, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.backend.path()
    }

    /// Reads the stored document. Absent or blank storage yields an empty one.
    ///
    /// # Errors
    ///
    /// Returns an I/O or storage error if reading fails, or a codec error if
    /// the content cannot be parsed (including any non-empty SQL file).
    pub fn load(&self) -> CoreResult<Document> {
        let text = self.backend.read().map_err(|e| self.storage_error(e))?;
        let document = match text {
            Some(text) if !text.trim().is_empty() => self.codec.decode(&text)?,
            _ => Document::new(),
        };
        info!(format = %self.format(), keys = document.len(), "loaded document");
        Ok(document)
    }

    /// Writes the document, replacing the previous one atomically.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails, or an I/O or storage error
    /// if writing fails.
    pub fn save(&self, document: &Document) -> CoreResult<()> {
        let text = self.codec.encode(document)?;
        self.backend
            .write(&text)
            .map_err(|e| self.storage_error(e))?;
        debug!(bytes = text.len(), "saved document");
        Ok(())
    }

    /// Renders the document in another format without touching storage.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails.
    pub fn export(document: &Document, format: Format, pretty: bool) -> CoreResult<String> {
        Ok(codec_for(format, pretty).encode(document)?)
    }

    fn storage_error(&self, err: StorageError) -> CoreError {
        storage_error(err, self.backend.path())
    }
}

/// Converts a backend error, redacting the path of I/O failures.
pub(crate) fn storage_error(err: StorageError, path: Option<&Path>) -> CoreError {
    match (err, path) {
        (StorageError::Io(io), Some(path)) => CoreError::io(io, path),
        (other, _) => other.into(),
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("format", &self.format())
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}
