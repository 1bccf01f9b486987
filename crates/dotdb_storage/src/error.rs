//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another handle already owns the document.
    #[error("document locked: {name} is open in another handle")]
    Locked {
        /// File name of the locked document.
        name: String,
    },

    /// The stored document is not valid UTF-8 text.
    #[error("document is not valid UTF-8 text")]
    NotText,
}
