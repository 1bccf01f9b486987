//! JSON document codec.

use crate::error::{CodecError, CodecResult};
use crate::{expect_object, Document, Format, FormatCodec};

/// Reads and writes documents as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Creates a JSON codec; `pretty` selects indented output.
    #[must_use]
    pub const fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl FormatCodec for JsonCodec {
    fn encode(&self, document: &Document) -> CodecResult<String> {
        let result = if self.pretty {
            serde_json::to_string_pretty(document)
        } else {
            serde_json::to_string(document)
        };
        result.map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    fn decode(&self, text: &str) -> CodecResult<Document> {
        if text.trim().is_empty() {
            return Ok(Document::new());
        }
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
        expect_object(value)
    }

    fn format(&self) -> Format {
        Format::Json
    }
}
