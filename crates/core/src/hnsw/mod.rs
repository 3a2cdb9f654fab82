//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! The graph lives only in memory and is rebuilt from the vector store at
//! process start by replaying ids in append order. Nodes hold nothing but
//! their level and per-layer adjacency lists of vector-store ids; every
//! distance computation fetches the vectors from the store, which remains
//! the single source of truth.

/// Euclidean distance, the reference metric.
pub mod distance;
/// Graph structure, node records, and rebuild/reset.
pub mod graph;
/// Insertion with bidirectional connections.
pub mod insert;
/// Greedy descent and beam search.
pub mod search;
/// Epoch-stamped visited set for graph traversal.
pub mod visited;

pub use graph::HnswIndex;
