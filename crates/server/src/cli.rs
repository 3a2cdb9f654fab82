//! Single-shot CLI commands.
//!
//! Each command reads one JSON payload (from `--input` or stdin), runs
//! against the stores opened by `main`, writes one JSON line to stdout,
//! and exits. Ingest commands skip the index entirely — the process ends
//! immediately, and the next retrieval rebuilds the graph from the
//! store. `retrieve` replays the vector store before searching.

use crate::api::models::{IngestDocumentRequest, IngestMessageRequest, RetrieveRequest};
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use contextdb_core::types::Metadata;
use contextdb_core::{
    Chunk, Document, HnswIndex, MetadataStore, MetadataValue, RetrievalConfig, Retriever,
    VectorStore,
};
use std::io::Read;
use std::sync::Arc;

/// Dispatches one CLI command.
pub fn run(
    cmd: &str,
    input: &str,
    vectors: Arc<VectorStore>,
    metadata: Arc<MetadataStore>,
) -> anyhow::Result<()> {
    let payload = read_payload(input)?;
    match cmd {
        "ingest_message" => ingest_message(&payload, &vectors, &metadata),
        "ingest_document" => ingest_document(&payload, &vectors, &metadata),
        "retrieve" => retrieve(&payload, vectors, metadata),
        other => bail!("unknown command: {other} (expected ingest_message | ingest_document | retrieve)"),
    }
}

fn read_payload(input: &str) -> anyhow::Result<String> {
    if !input.is_empty() {
        return Ok(input.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading JSON payload from stdin")?;
    if buf.trim().is_empty() {
        bail!("no input: pass --input or pipe a JSON payload via stdin");
    }
    Ok(buf)
}

fn ingest_message(
    payload: &str,
    vectors: &VectorStore,
    metadata: &MetadataStore,
) -> anyhow::Result<()> {
    let req: IngestMessageRequest =
        serde_json::from_str(payload).context("decoding ingest_message payload")?;
    if req.namespace.is_empty() {
        bail!("namespace is required");
    }
    if req.conversation_id.is_empty() {
        bail!("conversation_id is required");
    }
    if req.role.is_empty() {
        bail!("role is required");
    }
    if req.content.is_empty() {
        bail!("content is required");
    }
    if req.vector.is_empty() {
        bail!("vector is required");
    }

    let timestamp = match req.timestamp_utc.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .context("timestamp_utc must be RFC3339")?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let message_id = req.message_id.unwrap_or_else(|| {
        format!("msg-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
    });
    let doc_id = format!("chat:{}:{}", req.conversation_id, message_id);

    let mut doc_metadata = Metadata::new();
    doc_metadata.insert("namespace".to_string(), MetadataValue::from(req.namespace));
    doc_metadata.insert(
        "conversation_id".to_string(),
        MetadataValue::from(req.conversation_id),
    );
    doc_metadata.insert("message_id".to_string(), MetadataValue::from(message_id));
    doc_metadata.insert("role".to_string(), MetadataValue::from(req.role));
    doc_metadata.insert("type".to_string(), MetadataValue::from("chat_message"));

    metadata.save_document(&Document {
        id: doc_id.clone(),
        source: req.source.unwrap_or_else(|| "chat".to_string()),
        timestamp,
        metadata: doc_metadata,
    })?;

    let id = vectors.append(&req.vector)?;
    metadata.save_chunk(&Chunk {
        id,
        doc_id,
        content: req.content,
        start_line: 0,
        end_line: 0,
        token_count: req.token_count,
    })?;

    println!("{}", serde_json::json!({ "status": "ok", "id": id }));
    Ok(())
}

fn ingest_document(
    payload: &str,
    vectors: &VectorStore,
    metadata: &MetadataStore,
) -> anyhow::Result<()> {
    let req: IngestDocumentRequest =
        serde_json::from_str(payload).context("decoding ingest_document payload")?;
    if req.namespace.is_empty() {
        bail!("namespace is required");
    }
    if req.file_path.is_empty() {
        bail!("file_path is required");
    }
    if req.vector.is_empty() {
        bail!("vector is required");
    }

    let doc_id = format!(
        "file:{}:{}:{}-{}",
        req.namespace, req.file_path, req.start_line, req.end_line
    );

    let mut doc_metadata = Metadata::new();
    doc_metadata.insert("namespace".to_string(), MetadataValue::from(req.namespace));
    doc_metadata.insert(
        "file_path".to_string(),
        MetadataValue::from(req.file_path.clone()),
    );
    doc_metadata.insert("type".to_string(), MetadataValue::from("code"));

    metadata.save_document(&Document {
        id: doc_id.clone(),
        source: req.file_path,
        timestamp: Utc::now(),
        metadata: doc_metadata,
    })?;

    let id = vectors.append(&req.vector)?;
    metadata.save_chunk(&Chunk {
        id,
        doc_id,
        content: req.content,
        start_line: req.start_line,
        end_line: req.end_line,
        token_count: req.token_count,
    })?;

    println!("{}", serde_json::json!({ "status": "ok", "id": id }));
    Ok(())
}

fn retrieve(
    payload: &str,
    vectors: Arc<VectorStore>,
    metadata: Arc<MetadataStore>,
) -> anyhow::Result<()> {
    let req: RetrieveRequest =
        serde_json::from_str(payload).context("decoding retrieve payload")?;
    if req.query.is_empty() {
        bail!("query vector is required");
    }

    // The graph is in-memory only: replay the store before searching.
    let index = Arc::new(HnswIndex::new(Arc::clone(&vectors)));
    index.rebuild()?;

    let retriever = Retriever::new(index, vectors, metadata);
    let mut cfg = RetrievalConfig::default();
    if req.max_tokens > 0 {
        cfg.max_tokens = req.max_tokens.min(u32::MAX as i64) as u32;
    }
    cfg.namespace = req.namespace.filter(|ns| !ns.is_empty());

    let result = retriever.retrieve(&req.query, &cfg)?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
