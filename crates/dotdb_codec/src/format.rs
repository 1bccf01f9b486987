//! Supported on-disk formats.

use crate::error::{CodecError, CodecResult};
use std::fmt;
use std::path::Path;

/// An on-disk document notation, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Structured-object notation (`.json`).
    Json,
    /// Indented human-readable notation (`.yaml`, `.yml`).
    Yaml,
    /// Generated SQL statements (`.sql`), export-only.
    Sql,
}

impl Format {
    /// Resolves a format from a bare extension (without the dot).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for unknown extensions.
    pub fn from_extension(extension: &str) -> CodecResult<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "sql" => Ok(Self::Sql),
            other => Err(CodecError::unsupported_format(other)),
        }
    }

    /// Resolves a format from a file path's extension.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if the path has no known extension.
    pub fn from_path(path: &Path) -> CodecResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    /// The canonical extension written for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Sql => "sql",
        }
    }

    /// Whether documents in this format can be loaded back.
    #[must_use]
    pub const fn is_loadable(self) -> bool {
        !matches!(self, Self::Sql)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Sql => "SQL",
        };
        f.write_str(name)
    }
}
