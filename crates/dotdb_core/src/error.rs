//! Error types for DotDB core.

use regex::Regex;
use std::io;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in DotDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad key, table or column shape, schema violation, or broken relation.
    #[error("validation error: {message}")]
    Validation {
        /// Description of what was rejected.
        message: String,
    },

    /// A table, row, or key that the operation requires does not exist.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing item.
        what: String,
    },

    /// File or directory access failed. Absolute paths are redacted.
    #[error("I/O error: {message}")]
    Io {
        /// Sanitized description of the failure.
        message: String,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] dotdb_storage::StorageError),

    /// Format codec error.
    #[error("codec error: {0}")]
    Codec(#[from] dotdb_codec::CodecError),

    /// Encryption, decryption, or compression failed (strict mode only).
    #[error("crypto error: {message}")]
    Crypto {
        /// Description of the failure.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// Database is closed.
    #[error("database is closed")]
    Closed,
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates an I/O error for an operation on `path`.
    ///
    /// Only the final component of `path` appears in the message.
    pub fn io(err: io::Error, path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::Io {
            message: format!("{name}: {}", redact_paths(&err.to_string())),
        }
    }

    /// Creates a crypto error.
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for validation errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true for not-found errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<io::Error> for CoreError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            message: redact_paths(&err.to_string()),
        }
    }
}

/// Replaces the directory part of absolute paths in `message` with `<redacted>`.
pub(crate) fn redact_paths(message: &str) -> String {
    static ABSOLUTE: OnceLock<Regex> = OnceLock::new();
    let re = ABSOLUTE.get_or_init(|| {
        Regex::new(r#"(?:[A-Za-z]:)?[\\/](?:[^\\/\s"':]+[\\/])+"#).expect("path regex must compile")
    });
    re.replace_all(message, "<redacted>/").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_unix_directories() {
        assert_eq!(
            redact_paths("cannot open /home/alice/data/db.json now"),
            "cannot open <redacted>/db.json now"
        );
    }

    #[test]
    fn redacts_windows_directories() {
        assert_eq!(
            redact_paths(r"failed C:\Users\bob\db.yaml"),
            "failed <redacted>/db.yaml"
        );
    }

    #[test]
    fn leaves_plain_messages_alone() {
        assert_eq!(redact_paths("permission denied"), "permission denied");
    }

    #[test]
    fn io_keeps_only_file_name() {
        let err = CoreError::io(
            io::Error::new(io::ErrorKind::NotFound, "gone"),
            Path::new("/var/lib/app/store.json"),
        );
        assert_eq!(err.to_string(), "I/O error: store.json: gone");
    }

    #[test]
    fn classification_helpers() {
        assert!(CoreError::validation("x").is_validation());
        assert!(CoreError::not_found("x").is_not_found());
        assert!(!CoreError::Closed.is_validation());
    }
}
