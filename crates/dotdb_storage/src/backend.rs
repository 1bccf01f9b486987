//! Storage backend trait definition.

use crate::error::StorageResult;
use std::path::Path;

/// A whole-document storage backend for DotDB.
///
/// Backends are **opaque text stores**. DotDB owns format interpretation;
/// a backend only knows how to hand back the last document written and
/// how to replace it.
///
/// # Invariants
///
/// - `read` returns exactly the text of the last successful `write`
/// - `read` returns `None` (not an error) when nothing has been written
/// - a reader never observes a partially written document
/// - two `write` calls on the same backend never interleave
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait DocumentBackend: Send + Sync {
    /// Reads the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be read.
    fn read(&self) -> StorageResult<Option<String>>;

    /// Replaces the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written. The previous
    /// document stays intact when this fails.
    fn write(&self, document: &str) -> StorageResult<()>;

    /// Returns true if a document has been written.
    fn exists(&self) -> bool;

    /// Returns the on-disk location, if the backend has one.
    fn path(&self) -> Option<&Path> {
        None
    }
}
