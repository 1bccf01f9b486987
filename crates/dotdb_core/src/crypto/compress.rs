//! Deflate compression via `flate2`.

use super::Compressor;
use crate::error::{CoreError, CoreResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Zlib-framed deflate compressor.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCompressor {
    level: Compression,
}

impl DeflateCompressor {
    /// Creates a compressor with the default compression level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: Compression::default(),
        }
    }

    /// Creates a compressor with an explicit level (0-9).
    #[must_use]
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for DeflateCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor for DeflateCompressor {
    fn deflate(&self, data: &[u8]) -> CoreResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| CoreError::crypto(format!("compression failed: {e}")))?;
        encoder
            .finish()
            .map_err(|e| CoreError::crypto(format!("compression failed: {e}")))
    }

    fn inflate(&self, data: &[u8]) -> CoreResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| CoreError::crypto(format!("decompression failed: {e}")))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_inflate_roundtrip() {
        let compressor = DeflateCompressor::new();
        let data = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaabbbbbbbbbbbbbbbbbbbbbbb";
        let packed = compressor.deflate(data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(compressor.inflate(&packed).unwrap(), data);
    }

    #[test]
    fn inflate_rejects_garbage() {
        let compressor = DeflateCompressor::with_level(6);
        assert!(compressor.inflate(b"definitely not zlib").is_err());
    }

    #[test]
    fn empty_input() {
        let compressor = DeflateCompressor::default();
        let packed = compressor.deflate(b"").unwrap();
        assert!(compressor.inflate(&packed).unwrap().is_empty());
    }
}
