//! # DotDB Codec
//!
//! Text format codecs for DotDB documents.
//!
//! A DotDB document is a JSON object tree ([`Document`]). This crate turns
//! that tree into one of the supported on-disk notations and back:
//!
//! | Extension        | Codec         | Load | Save |
//! |------------------|---------------|------|------|
//! | `.json`          | [`JsonCodec`] | yes  | yes  |
//! | `.yaml`, `.yml`  | [`YamlCodec`] | yes  | yes  |
//! | `.sql`           | [`SqlCodec`]  | no   | yes  |
//!
//! The SQL codec produces `CREATE TABLE` / `CREATE INDEX` / `INSERT`
//! statements and is export-only.
//!
//! ## Usage
//!
//! ```
//! use dotdb_codec::{codec_for, Document, Format};
//! use serde_json::json;
//!
//! let mut doc = Document::new();
//! doc.insert("answer".into(), json!(42));
//!
//! let codec = codec_for(Format::Json, false);
//! let text = codec.encode(&doc).unwrap();
//! assert_eq!(codec.decode(&text).unwrap(), doc);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod format;
mod json;
mod sql;
mod yaml;

pub use error::{CodecError, CodecResult};
pub use format::Format;
pub use json::JsonCodec;
pub use sql::SqlCodec;
pub use yaml::YamlCodec;

/// The in-memory document tree every codec reads and writes.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Reserved key marking a node as a table and holding its schema.
pub const META_KEY: &str = "_meta";

/// Converts a whole document to and from one textual notation.
pub trait FormatCodec: Send + Sync {
    /// Renders the document as text.
    fn encode(&self, document: &Document) -> CodecResult<String>;

    /// Parses text back into a document.
    ///
    /// Blank input decodes to an empty document.
    fn decode(&self, text: &str) -> CodecResult<Document>;

    /// The format this codec implements.
    fn format(&self) -> Format;
}

/// Returns the codec for a format.
///
/// `pretty` selects indented output where the notation has a choice.
#[must_use]
pub fn codec_for(format: Format, pretty: bool) -> Box<dyn FormatCodec> {
    match format {
        Format::Json => Box::new(JsonCodec::new(pretty)),
        Format::Yaml => Box::new(YamlCodec),
        Format::Sql => Box::new(SqlCodec),
    }
}

/// Returns true if the value is a table node (an object holding [`META_KEY`]).
#[must_use]
pub fn is_table(value: &serde_json::Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.get(META_KEY).is_some_and(serde_json::Value::is_object))
}

fn expect_object(value: serde_json::Value) -> CodecResult<Document> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(Document::new()),
        other => Err(CodecError::decoding_failed(format!(
            "document root must be a mapping, found {}",
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        let value = json!({
            "settings": "token-abc",
            "users": {
                "_meta": {"columns": ["name"], "validations": {}, "indexes": [], "relations": {}, "rowCount": 1},
                "r1": {"name": "token-xyz"}
            }
        });
        expect_object(value).unwrap()
    }

    #[test]
    fn json_and_yaml_agree() {
        let doc = sample();
        for format in [Format::Json, Format::Yaml] {
            let codec = codec_for(format, true);
            let text = codec.encode(&doc).unwrap();
            assert_eq!(codec.decode(&text).unwrap(), doc, "{format:?}");
        }
    }

    #[test]
    fn detects_tables() {
        let doc = sample();
        assert!(is_table(&doc["users"]));
        assert!(!is_table(&doc["settings"]));
        assert!(!is_table(&json!({"_meta": 1})));
    }

    #[test]
    fn root_must_be_mapping() {
        assert!(expect_object(json!([1, 2])).is_err());
        assert!(expect_object(json!(null)).unwrap().is_empty());
    }
}
