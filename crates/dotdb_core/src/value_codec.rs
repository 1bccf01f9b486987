//! Per-value encode/decode pipeline.
//!
//! ```text
//! encode: value -> JSON text -> deflate -> base64 -> encrypt -> token
//! decode: token -> decrypt -> base64 -> inflate -> JSON text -> value
//! ```
//!
//! `null` passes through untouched in both directions. In the default
//! soft-fail mode a failure at any step hands back the input unchanged;
//! with `strict` set the failure is returned as [`CoreError::Crypto`].

use crate::crypto::{AesGcmCipher, Cipher, Compressor, DeflateCompressor};
use crate::error::{CoreError, CoreResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, warn};

/// Turns structured values into opaque encrypted tokens and back.
pub struct ValueCodec {
    cipher: Box<dyn Cipher>,
    compressor: Box<dyn Compressor>,
    strict: bool,
}

impl ValueCodec {
    /// Creates a codec from explicit collaborators.
    #[must_use]
    pub fn new(cipher: Box<dyn Cipher>, compressor: Box<dyn Compressor>, strict: bool) -> Self {
        Self {
            cipher,
            compressor,
            strict,
        }
    }

    /// Creates the standard AES-GCM + deflate codec keyed by `secret`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the secret is empty.
    pub fn from_secret(secret: &str, strict: bool) -> CoreResult<Self> {
        let cipher = AesGcmCipher::from_secret(secret)?;
        Ok(Self::new(
            Box::new(cipher),
            Box::new(DeflateCompressor::new()),
            strict,
        ))
    }

    /// Whether failures are surfaced instead of passed through.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Encodes a value into a token.
    ///
    /// # Errors
    ///
    /// Only in strict mode, when any pipeline step fails.
    pub fn encode(&self, value: &Value) -> CoreResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self.seal(value) {
            Ok(token) => Ok(Value::String(token)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!(error = %e, "value encode failed, storing original value");
                Ok(value.clone())
            }
        }
    }

    /// Decodes a token back into a value.
    ///
    /// Values that are not strings are returned as they are.
    ///
    /// # Errors
    ///
    /// Only in strict mode, when a string fails to decode.
    pub fn decode(&self, value: &Value) -> CoreResult<Value> {
        let Value::String(token) = value else {
            return Ok(value.clone());
        };
        match self.open(token) {
            Ok(decoded) => Ok(decoded),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                debug!(error = %e, "value decode failed, returning stored value");
                Ok(value.clone())
            }
        }
    }

    fn seal(&self, value: &Value) -> CoreResult<String> {
        let text = serde_json::to_string(value)
            .map_err(|e| CoreError::crypto(format!("serialization failed: {e}")))?;
        let compressed = self.compressor.deflate(text.as_bytes())?;
        let inner = STANDARD.encode(compressed);
        self.cipher.encrypt(inner.as_bytes())
    }

    fn open(&self, token: &str) -> CoreResult<Value> {
        let inner = self.cipher.decrypt(token)?;
        let compressed = STANDARD
            .decode(inner)
            .map_err(|_| CoreError::crypto("inner payload is not base64"))?;
        let bytes = self.compressor.inflate(&compressed)?;
        let text =
            String::from_utf8(bytes).map_err(|_| CoreError::crypto("payload is not UTF-8"))?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

impl std::fmt::Debug for ValueCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCodec")
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn codec() -> ValueCodec {
        ValueCodec::from_secret("test-secret", false).unwrap()
    }

    #[test]
    fn roundtrip_structured_values() {
        let codec = codec();
        for value in [
            json!("text"),
            json!(42),
            json!(-3.5),
            json!(true),
            json!([1, "two", {"three": 3}]),
            json!({"nested": {"deep": [null, false]}}),
        ] {
            let token = codec.encode(&value).unwrap();
            assert!(token.is_string());
            assert_ne!(token, value);
            assert_eq!(codec.decode(&token).unwrap(), value);
        }
    }

    #[test]
    fn null_passes_through() {
        let codec = codec();
        assert_eq!(codec.encode(&Value::Null).unwrap(), Value::Null);
        assert_eq!(codec.decode(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn non_string_decodes_unchanged() {
        let codec = codec();
        let raw = json!({"plain": 1});
        assert_eq!(codec.decode(&raw).unwrap(), raw);
    }

    #[test]
    fn soft_fail_returns_input() {
        let codec = codec();
        let garbage = json!("not a token");
        assert_eq!(codec.decode(&garbage).unwrap(), garbage);
    }

    #[test]
    fn strict_mode_surfaces_failure() {
        let codec = ValueCodec::from_secret("test-secret", true).unwrap();
        let err = codec.decode(&json!("not a token")).unwrap_err();
        assert!(matches!(err, CoreError::Crypto { .. }));
    }

    #[test]
    fn other_secret_cannot_read() {
        let token = codec().encode(&json!("private")).unwrap();
        let other = ValueCodec::from_secret("another", false).unwrap();
        assert_eq!(other.decode(&token).unwrap(), token);
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            any::<f64>()
                .prop_filter("finite", |f| f.is_finite())
                .prop_map(|f| json!(f)),
            ".*".prop_map(Value::String),
        ]
    }

    fn structured() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(value in structured()) {
            let codec = codec();
            let token = codec.encode(&value).unwrap();
            prop_assert_eq!(codec.decode(&token).unwrap(), value);
        }
    }
}
