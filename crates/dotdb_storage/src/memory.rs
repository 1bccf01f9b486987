//! In-memory storage backend for testing.

use crate::backend::DocumentBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;

/// An in-memory document backend.
///
/// This backend keeps the document in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Example
///
/// ```rust
/// use dotdb_storage::{DocumentBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// assert!(!backend.exists());
/// backend.write("hello").unwrap();
/// assert_eq!(backend.writes(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    document: RwLock<Option<String>>,
    writes: RwLock<u64>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding an existing document.
    ///
    /// Useful for testing load paths.
    #[must_use]
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(Some(document.into())),
            writes: RwLock::new(0),
        }
    }

    /// Returns how many times the document was replaced.
    #[must_use]
    pub fn writes(&self) -> u64 {
        *self.writes.read()
    }
}

impl DocumentBackend for InMemoryBackend {
    fn read(&self) -> StorageResult<Option<String>> {
        Ok(self.document.read().clone())
    }

    fn write(&self, document: &str) -> StorageResult<()> {
        let mut slot = self.document.write();
        *slot = Some(document.to_string());
        *self.writes.write() += 1;
        Ok(())
    }

    fn exists(&self) -> bool {
        self.document.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backend_reads_none() {
        let backend = InMemoryBackend::new();
        assert!(backend.read().unwrap().is_none());
        assert!(!backend.exists());
    }

    #[test]
    fn write_replaces_document() {
        let backend = InMemoryBackend::new();
        backend.write("first").unwrap();
        backend.write("second").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("second"));
        assert_eq!(backend.writes(), 2);
    }

    #[test]
    fn with_document_preloads() {
        let backend = InMemoryBackend::with_document("{}");
        assert!(backend.exists());
        assert_eq!(backend.writes(), 0);
    }

    #[test]
    fn has_no_path() {
        assert!(InMemoryBackend::new().path().is_none());
    }
}
