//! Cryptographic and compression primitives behind the value codec.
//!
//! Every stored value goes through a [`Compressor`] and then a [`Cipher`].
//! Both are traits so the value codec does not depend on a concrete
//! algorithm; DotDB ships [`AesGcmCipher`] and [`DeflateCompressor`].
//!
//! ## Security Model
//!
//! - AES-256-GCM authenticated encryption
//! - Unique random nonce per encryption
//! - Key derived from the caller's secret with HKDF-SHA256
//! - Key material is zeroized on drop

mod cipher;
mod compress;

pub use cipher::{AesGcmCipher, EncryptionKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use compress::DeflateCompressor;

use crate::error::CoreResult;

/// Symmetric cipher turning bytes into a printable token and back.
pub trait Cipher: Send + Sync {
    /// Encrypts `plaintext` into a printable token.
    fn encrypt(&self, plaintext: &[u8]) -> CoreResult<String>;

    /// Decrypts a token produced by [`Cipher::encrypt`].
    fn decrypt(&self, token: &str) -> CoreResult<Vec<u8>>;
}

/// General-purpose byte compressor.
pub trait Compressor: Send + Sync {
    /// Compresses `data`.
    fn deflate(&self, data: &[u8]) -> CoreResult<Vec<u8>>;

    /// Decompresses data produced by [`Compressor::deflate`].
    fn inflate(&self, data: &[u8]) -> CoreResult<Vec<u8>>;
}
