//! Global configuration constants for contextdb.
//!
//! Tuning parameters and input validation limits are defined here as
//! compile-time constants; runtime configuration is handled via CLI
//! arguments and environment variables in the server binary.

/// Number of bidirectional links per HNSW node on layers above 0.
pub const HNSW_M: usize = 16;

/// Maximum links per node at layer 0 (denser base layer, `2 * M`).
pub const HNSW_M0: usize = 32;

/// Candidate list size during HNSW index construction.
pub const HNSW_EF_CONSTRUCTION: usize = 40;

/// Candidate list size during HNSW search (higher = better recall, slower).
pub const HNSW_EF_SEARCH: usize = 50;

/// Maximum number of layers in the HNSW graph.
pub const HNSW_MAX_LEVEL: usize = 16;

/// Retention probability of the geometric level draw: a node reaches
/// level `l` with probability `LEVEL_PROBABILITY^l`.
pub const HNSW_LEVEL_PROBABILITY: f64 = 0.5;

/// Default token budget when a retrieve request does not supply one.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// ANN candidates fetched before metadata lookup and re-ranking.
pub const DEFAULT_TOP_K_CANDIDATES: usize = 50;

/// Default weight of the similarity term in the combined score.
pub const DEFAULT_SIMILARITY_WEIGHT: f32 = 0.8;

/// Default weight of the recency term in the combined score.
pub const DEFAULT_RECENCY_WEIGHT: f32 = 0.2;

/// Vector file name inside the data directory.
pub const VECTORS_FILENAME: &str = "vectors.bin";

/// Metadata database file name inside the data directory.
pub const METADATA_FILENAME: &str = "metadata.db";

/// Vectors a fresh store file is pre-grown to hold.
pub const INITIAL_VECTOR_CAPACITY: u64 = 1024;

/// Maximum allowed embedding dimension.
pub const MAX_DIMENSION: usize = 4096;

/// Maximum HTTP request body size in bytes (32 MB — a 1536-dim ingest
/// batch of a few hundred chunks fits comfortably).
pub const MAX_REQUEST_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Default listen address for the HTTP server.
pub const DEFAULT_ADDR: &str = ":8080";
