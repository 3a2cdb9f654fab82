//! Request and response data transfer objects.
//!
//! Required fields are modeled with serde defaults so that an absent
//! field reaches the handler's own validation (and a clear 400 message)
//! instead of a generic deserialization rejection. Retrieval responses
//! serialize the core [`contextdb_core::RetrievalResult`] directly.

use contextdb_core::{Document, Vector};
use serde::{Deserialize, Serialize};

/// One chunk in an ingest payload. Unlike the stored record, it carries
/// the embedding; the id is assigned by the vector store.
#[derive(Debug, Deserialize)]
pub struct IngestChunk {
    pub doc_id: String,
    #[serde(default)]
    pub vector: Vector,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub token_count: u32,
}

/// Body of `POST /ingest`.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Optional logical partition; merged into
    /// `document.metadata.namespace` unless already present.
    #[serde(default)]
    pub namespace: Option<String>,
    pub document: Document,
    #[serde(default)]
    pub chunks: Vec<IngestChunk>,
}

/// Response of `POST /ingest`.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub doc_id: String,
    pub chunk_ids: Vec<u64>,
    pub vector_count: u64,
}

/// Body of `POST /ingest_message` — convenience for chat/memory style
/// ingestion of exactly one document plus one chunk.
#[derive(Debug, Deserialize)]
pub struct IngestMessageRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub conversation_id: String,
    /// Optional; a time-based id is generated when absent.
    #[serde(default)]
    pub message_id: Option<String>,
    /// `"user" | "assistant" | "system"`.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub vector: Vector,
    #[serde(default)]
    pub token_count: u32,
    /// Optional RFC3339 timestamp; now when absent.
    #[serde(default)]
    pub timestamp_utc: Option<String>,
    /// Optional source descriptor; `"chat"` when absent.
    #[serde(default)]
    pub source: Option<String>,
}

/// Response of `POST /ingest_message`.
#[derive(Debug, Serialize)]
pub struct IngestMessageResponse {
    pub status: &'static str,
    pub doc_id: String,
    pub chunk_id: u64,
    pub vector_count: u64,
    pub message_id: String,
    pub conversation_id: String,
    pub namespace: String,
}

/// Body of `POST /retrieve` (also the CLI retrieve payload).
#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    /// Optional partition filter on `document.metadata.namespace`.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub query: Vector,
    /// Values ≤ 0 fall back to the engine default budget.
    #[serde(default)]
    pub max_tokens: i64,
}

/// CLI-only payload for `--cmd ingest_document`: one code chunk with its
/// file coordinates.
#[derive(Debug, Deserialize)]
pub struct IngestDocumentRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub vector: Vector,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default)]
    pub start_line: u32,
    #[serde(default)]
    pub end_line: u32,
}

/// Response of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub time_utc: String,
    pub vec_count: u64,
}

/// Response of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub vec_count: u64,
}

/// Response of `POST /reset`.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
}
