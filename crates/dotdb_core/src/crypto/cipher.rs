//! Value encryption using AES-256-GCM.

use super::Cipher;
use crate::error::{CoreError, CoreResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// HKDF salt binding derived keys to DotDB value encryption.
const KEY_SALT: &[u8] = b"dotdb-value-salt-v1";
/// HKDF info string for the value key.
const KEY_INFO: &[u8] = b"dotdb-value-key-v1";

/// Encryption key for AES-256-GCM.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Derives a key from a caller-supplied secret using HKDF-SHA256.
    ///
    /// The same secret always yields the same key, so values written in
    /// one session can be read in the next.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the secret is empty.
    pub fn derive_from_secret(secret: &str) -> CoreResult<Self> {
        if secret.is_empty() {
            return Err(CoreError::validation("encryption secret must not be empty"));
        }

        let hk = Hkdf::<Sha256>::new(Some(KEY_SALT), secret.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(KEY_INFO, &mut bytes)
            .map_err(|_| CoreError::crypto("HKDF expand failed"))?;

        Ok(Self { bytes })
    }

    /// Returns the key as a byte slice.
    ///
    /// # Security
    ///
    /// Don't log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// AES-256-GCM cipher producing base64 tokens.
///
/// Token layout before base64: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Creates a cipher with the given key.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let key_array = GenericArray::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key_array),
        }
    }

    /// Creates a cipher keyed from a secret.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the secret is empty.
    pub fn from_secret(secret: &str) -> CoreResult<Self> {
        let key = EncryptionKey::derive_from_secret(secret)?;
        Ok(Self::new(&key))
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> CoreResult<String> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CoreError::crypto("encryption error"))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend(ciphertext);

        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, token: &str) -> CoreResult<Vec<u8>> {
        let sealed = STANDARD
            .decode(token)
            .map_err(|_| CoreError::crypto("token is not base64"))?;
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CoreError::crypto("token too short"));
        }

        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|_| CoreError::crypto("decryption error"))
    }
}

impl std::fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCipher").finish_non_exhaustive()
    }
}
