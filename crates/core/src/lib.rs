//! # contextdb-core
//!
//! Embeddable semantic-retrieval engine for local RAG workloads: an
//! append-only memory-mapped vector store, a durable document/chunk
//! metadata store, an in-memory HNSW approximate nearest-neighbor index,
//! and a retrieval engine that combines similarity with recency and packs
//! results into a caller-supplied token budget.
//!
//! This is the core library crate with no async dependencies — suitable
//! for embedding directly behind a server, a CLI, or another binding.

/// Global configuration constants: HNSW parameters, retrieval defaults, and limits.
pub mod config;
/// The crate-wide error type and `Result` alias.
pub mod error;
/// HNSW approximate nearest neighbor index: graph structure, insertion, and search.
pub mod hnsw;
/// Retrieval engine: candidate gathering, scoring, namespace filtering, token packing.
pub mod retrieval;
/// Storage layer: memory-mapped vector store and redb-backed metadata store.
pub mod storage;
/// Core domain types: `Vector`, `Document`, `Chunk`, and `MetadataValue`.
pub mod types;

pub use error::{Error, Result};
pub use hnsw::HnswIndex;
pub use retrieval::{RetrievalConfig, RetrievalResult, Retriever, ScoredChunk};
pub use storage::{MetadataStore, VectorStore};
pub use types::{Chunk, Document, MetadataValue, Vector};
