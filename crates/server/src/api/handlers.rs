//! HTTP request handlers and shared application state.

use crate::api::errors::ApiError;
use crate::api::models::*;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use contextdb_core::{
    Chunk, Document, HnswIndex, MetadataStore, MetadataValue, RetrievalConfig,
    RetrievalResult, Retriever, VectorStore,
};
use std::sync::Arc;

/// Shared state handed to every handler.
///
/// The adapter holds the engine plus direct store references: ingest and
/// health go straight to the stores, retrieve goes through the engine.
#[derive(Clone)]
pub struct AppState {
    pub vectors: Arc<VectorStore>,
    pub metadata: Arc<MetadataStore>,
    pub index: Arc<HnswIndex>,
    pub retriever: Arc<Retriever>,
}

impl AppState {
    pub fn new(
        vectors: Arc<VectorStore>,
        metadata: Arc<MetadataStore>,
        index: Arc<HnswIndex>,
    ) -> Self {
        let retriever = Arc::new(Retriever::new(
            Arc::clone(&index),
            Arc::clone(&vectors),
            Arc::clone(&metadata),
        ));
        Self {
            vectors,
            metadata,
            index,
            retriever,
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn validate_vector(vector: &[f32], field: &str) -> Result<(), ApiError> {
    if vector.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    if vector.iter().any(|v| v.is_nan() || v.is_infinite()) {
        return Err(ApiError::BadRequest(format!(
            "{field} contains NaN or Inf"
        )));
    }
    Ok(())
}

/// `GET /` — service descriptor.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "contextdb",
        "ok": true,
        "time_utc": now_rfc3339(),
        "endpoints": ["/health", "/stats", "/ingest", "/ingest_message", "/retrieve", "/reset"],
        "api_schema": 1,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time_utc: now_rfc3339(),
        vec_count: state.vectors.count(),
    })
}

/// `GET /stats`
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        vec_count: state.vectors.count(),
    })
}

/// `POST /reset` — rebuilds the in-memory graph from the vector store.
/// Persistent files are untouched.
pub async fn reset(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    let indexed = state.index.rebuild()?;
    tracing::info!(indexed, "index reset and rebuilt");
    Ok(Json(ResetResponse { status: "reset_ok" }))
}

/// `POST /ingest` — one document plus any number of chunks.
///
/// The document is durable before the first chunk; each chunk's vector
/// and record are persisted before the chunk enters the index, so a
/// concurrent retrieval sees both or neither.
pub async fn ingest(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(mut req) = payload?;

    if req.document.id.is_empty() {
        return Err(ApiError::BadRequest("document.id is required".into()));
    }
    for chunk in &req.chunks {
        validate_vector(&chunk.vector, "chunk.vector")?;
    }

    if let Some(ns) = req.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        req.document
            .metadata
            .entry("namespace".to_string())
            .or_insert_with(|| MetadataValue::from(ns));
    }

    tracing::info!(
        doc_id = %req.document.id,
        source = %req.document.source,
        chunks = req.chunks.len(),
        "ingest"
    );

    state.metadata.save_document(&req.document)?;

    let mut chunk_ids = Vec::with_capacity(req.chunks.len());
    for ic in req.chunks {
        let id = state.vectors.append(&ic.vector)?;
        state.metadata.save_chunk(&Chunk {
            id,
            doc_id: ic.doc_id,
            content: ic.content,
            start_line: ic.start_line,
            end_line: ic.end_line,
            token_count: ic.token_count,
        })?;
        state.index.add(id, &ic.vector)?;
        chunk_ids.push(id);
    }

    let vector_count = state.vectors.count();
    tracing::info!(doc_id = %req.document.id, ingested = chunk_ids.len(), vector_count, "ingest ok");

    Ok(Json(IngestResponse {
        status: "ingested",
        doc_id: req.document.id,
        chunk_ids,
        vector_count,
    }))
}

/// `POST /ingest_message` — chat convenience: exactly one document plus
/// one chunk, with a synthesized `chat:{conversation}:{message}` doc id.
pub async fn ingest_message(
    State(state): State<AppState>,
    payload: Result<Json<IngestMessageRequest>, JsonRejection>,
) -> Result<Json<IngestMessageResponse>, ApiError> {
    let Json(req) = payload?;

    if req.namespace.is_empty() {
        return Err(ApiError::BadRequest("namespace is required".into()));
    }
    if req.conversation_id.is_empty() {
        return Err(ApiError::BadRequest("conversation_id is required".into()));
    }
    if req.role.is_empty() {
        return Err(ApiError::BadRequest("role is required".into()));
    }
    if req.content.is_empty() {
        return Err(ApiError::BadRequest("content is required".into()));
    }
    validate_vector(&req.vector, "vector")?;

    let timestamp = match req.timestamp_utc.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map_err(|_| ApiError::BadRequest("timestamp_utc must be RFC3339".into()))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let source = req.source.unwrap_or_else(|| "chat".to_string());
    let message_id = req.message_id.unwrap_or_else(generate_message_id);
    // Stable across retries when the caller supplies a stable message_id.
    let doc_id = format!("chat:{}:{}", req.conversation_id, message_id);

    let mut metadata = contextdb_core::types::Metadata::new();
    metadata.insert("namespace".to_string(), MetadataValue::from(req.namespace.clone()));
    metadata.insert(
        "conversation_id".to_string(),
        MetadataValue::from(req.conversation_id.clone()),
    );
    metadata.insert("message_id".to_string(), MetadataValue::from(message_id.clone()));
    metadata.insert("role".to_string(), MetadataValue::from(req.role));
    metadata.insert("type".to_string(), MetadataValue::from("chat_message"));

    tracing::info!(
        namespace = %req.namespace,
        conversation_id = %req.conversation_id,
        message_id = %message_id,
        "ingest_message"
    );

    state.metadata.save_document(&Document {
        id: doc_id.clone(),
        source,
        timestamp,
        metadata,
    })?;

    let chunk_id = state.vectors.append(&req.vector)?;
    state.metadata.save_chunk(&Chunk {
        id: chunk_id,
        doc_id: doc_id.clone(),
        content: req.content,
        start_line: 0,
        end_line: 0,
        token_count: req.token_count,
    })?;
    state.index.add(chunk_id, &req.vector)?;

    let vector_count = state.vectors.count();
    tracing::info!(doc_id = %doc_id, chunk_id, vector_count, "ingest_message ok");

    Ok(Json(IngestMessageResponse {
        status: "ingested_message",
        doc_id,
        chunk_id,
        vector_count,
        message_id,
        conversation_id: req.conversation_id,
        namespace: req.namespace,
    }))
}

/// `POST /retrieve`
pub async fn retrieve(
    State(state): State<AppState>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Json<RetrievalResult>, ApiError> {
    let Json(req) = payload?;

    if req.query.is_empty() {
        return Err(ApiError::BadRequest("query vector is required".into()));
    }

    let mut cfg = RetrievalConfig::default();
    if req.max_tokens > 0 {
        cfg.max_tokens = req.max_tokens.min(u32::MAX as i64) as u32;
    }
    cfg.namespace = req.namespace.filter(|ns| !ns.is_empty());

    let result = state.retriever.retrieve(&req.query, &cfg)?;
    Ok(Json(result))
}

/// Time-based message id for callers that did not supply one.
fn generate_message_id() -> String {
    format!(
        "msg-{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}
