//! YAML document codec.

use crate::error::{CodecError, CodecResult};
use crate::{expect_object, Document, Format, FormatCodec};

/// Reads and writes documents as indented YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl FormatCodec for YamlCodec {
    fn encode(&self, document: &Document) -> CodecResult<String> {
        serde_yaml::to_string(document).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }

    fn decode(&self, text: &str) -> CodecResult<Document> {
        if text.trim().is_empty() {
            return Ok(Document::new());
        }
        let value: serde_json::Value =
            serde_yaml::from_str(text).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
        expect_object(value)
    }

    fn format(&self) -> Format {
        Format::Yaml
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_values_are_indented() {
        let mut doc = Document::new();
        doc.insert("config".into(), json!({"debug": true, "level": 3}));
        let text = YamlCodec.encode(&doc).unwrap();
        assert!(text.contains("config:\n  debug: true\n  level: 3"));
    }

    #[test]
    fn decodes_handwritten_yaml() {
        let doc = YamlCodec.decode("name: demo\ntags:\n  - a\n  - b\n").unwrap();
        assert_eq!(doc["name"], json!("demo"));
        assert_eq!(doc["tags"], json!(["a", "b"]));
    }

    #[test]
    fn scalar_root_is_rejected() {
        assert!(YamlCodec.decode("just a string").is_err());
    }
}
