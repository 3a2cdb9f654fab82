//! Core domain types.
//!
//! A [`Document`] is the source object (file, chat message) that produced
//! one or more [`Chunk`]s; chunks are the atomic unit of retrieval. The
//! embedding itself is not part of the chunk record — it lives in the
//! vector store at the same id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fixed-dimension embedding vector.
pub type Vector = Vec<f32>;

/// A metadata value attached to a document.
///
/// Untagged so that a plain JSON object round-trips: `true` becomes
/// `Boolean`, whole numbers become `Integer`, other numbers `Float`,
/// strings `String`. Arrays and nested objects are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean value.
    Boolean(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl MetadataValue {
    /// Returns the string payload, or `None` for non-string values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

/// Document metadata map. Conventional keys: `namespace`,
/// `conversation_id`, `role`, `message_id`, `type`, `file_path`.
pub type Metadata = HashMap<String, MetadataValue>;

/// A source item that produced one or more chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Caller-assigned identifier (e.g. `chat:{conversation}:{message}`).
    pub id: String,
    /// Source descriptor: a file path, `"chat"`, etc.
    pub source: String,
    /// Timestamp used for recency scoring. Defaults to now when absent
    /// from an ingest payload.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Open key-value metadata; `namespace` partitions retrieval.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Returns the document's namespace attribute, if present and a string.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.get("namespace").and_then(MetadataValue::as_str)
    }
}

/// A unit of retrievable content.
///
/// `id` doubles as the vector-store index of the chunk's embedding; both
/// are assigned together at ingest and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Internal sequential id, equal to the vector-store index.
    pub id: u64,
    /// Owning document id.
    pub doc_id: String,
    /// The text content.
    pub content: String,
    /// First source line for code chunks (0 when not applicable).
    #[serde(default)]
    pub start_line: u32,
    /// Last source line for code chunks (0 when not applicable).
    #[serde(default)]
    pub end_line: u32,
    /// Caller-supplied token count used for budget packing.
    #[serde(default)]
    pub token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_value_untagged_round_trip() {
        let json = r#"{"namespace":"proj1","pinned":true,"rank":3,"score":0.5}"#;
        let map: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(map["namespace"], MetadataValue::String("proj1".into()));
        assert_eq!(map["pinned"], MetadataValue::Boolean(true));
        assert_eq!(map["rank"], MetadataValue::Integer(3));
        assert_eq!(map["score"], MetadataValue::Float(0.5));

        let back = serde_json::to_value(&map).unwrap();
        assert_eq!(back["namespace"], "proj1");
        assert_eq!(back["rank"], 3);
    }

    #[test]
    fn document_defaults_fill_timestamp_and_metadata() {
        let doc: Document =
            serde_json::from_str(r#"{"id":"doc-A","source":"a.rs"}"#).unwrap();
        assert_eq!(doc.id, "doc-A");
        assert!(doc.metadata.is_empty());
        assert!(doc.namespace().is_none());
    }

    #[test]
    fn document_namespace_reads_string_only() {
        let doc: Document = serde_json::from_str(
            r#"{"id":"d","source":"s","metadata":{"namespace":"ws1"}}"#,
        )
        .unwrap();
        assert_eq!(doc.namespace(), Some("ws1"));

        let doc: Document = serde_json::from_str(
            r#"{"id":"d","source":"s","metadata":{"namespace":7}}"#,
        )
        .unwrap();
        assert_eq!(doc.namespace(), None);
    }

    #[test]
    fn chunk_optional_fields_default_to_zero() {
        let chunk: Chunk =
            serde_json::from_str(r#"{"id":0,"doc_id":"d","content":"hello"}"#).unwrap();
        assert_eq!(chunk.start_line, 0);
        assert_eq!(chunk.end_line, 0);
        assert_eq!(chunk.token_count, 0);
    }
}
