//! Storage layer.
//!
//! Two persistent stores live side by side in the data directory:
//! `vectors.bin`, an append-only memory-mapped float32 vector file, and
//! `metadata.db`, a redb key-value database holding document and chunk
//! records as JSON blobs.

/// Durable document/chunk store backed by redb.
pub mod metadata;
/// Append-only memory-mapped vector store.
pub mod vectors;

pub use metadata::MetadataStore;
pub use vectors::VectorStore;
