//! HNSW graph structure.
//!
//! [`HnswIndex`] wraps the graph in a single `RwLock`: insertion takes it
//! exclusive, search takes it shared. The graph is a map of node records
//! keyed by vector-store id with adjacency stored as id lists — no
//! pointer graph, so nodes stay movable and ownership stays acyclic.

use crate::config;
use crate::error::Result;
use crate::storage::VectorStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// One graph node: its assigned top level and per-layer adjacency.
#[derive(Debug)]
pub(crate) struct Node {
    pub level: usize,
    /// `neighbors[layer]` holds the node's links at that layer;
    /// `neighbors.len() == level + 1`.
    pub neighbors: Vec<Vec<u64>>,
}

impl Node {
    pub(crate) fn new(level: usize) -> Self {
        Self {
            level,
            neighbors: vec![Vec::new(); level + 1],
        }
    }
}

/// Mutable graph state behind the index lock.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    pub nodes: HashMap<u64, Node>,
    pub entry_point: Option<u64>,
    pub max_level: usize,
}

/// In-memory approximate nearest-neighbor index over a [`VectorStore`].
///
/// The index stores graph structure and ids only; vectors are fetched
/// from the store for every distance computation. Callers never hold the
/// index lock across a store append — the two locks are independent.
pub struct HnswIndex {
    pub(crate) vectors: Arc<VectorStore>,
    pub(crate) graph: RwLock<Graph>,
}

impl HnswIndex {
    /// Creates an empty index reading vectors from `vectors`.
    pub fn new(vectors: Arc<VectorStore>) -> Self {
        Self {
            vectors,
            graph: RwLock::new(Graph::default()),
        }
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.graph.read().nodes.len()
    }

    /// Returns `true` if no nodes are indexed.
    pub fn is_empty(&self) -> bool {
        self.graph.read().nodes.is_empty()
    }

    /// Drops all nodes, the entry point, and the max level. The vector
    /// store is untouched.
    pub fn clear(&self) {
        *self.graph.write() = Graph::default();
    }

    /// Clears the graph and re-inserts every stored vector in id order.
    /// Returns the number of vectors indexed.
    ///
    /// Called at process start and by the reset endpoint; replaying in
    /// append order keeps the rebuilt graph equivalent to the one built
    /// incrementally at ingest time.
    pub fn rebuild(&self) -> Result<usize> {
        self.clear();
        let count = self.vectors.count();
        for id in 0..count {
            let vector = self.vectors.get(id)?;
            self.add(id, &vector)?;
        }
        tracing::debug!(count, "hnsw graph rebuilt from vector store");
        Ok(count as usize)
    }
}

/// Draw a node level from a geometric distribution with retention
/// probability [`config::HNSW_LEVEL_PROBABILITY`], capped at
/// [`config::HNSW_MAX_LEVEL`].
pub(crate) fn random_level() -> usize {
    let mut level = 0;
    while rand::random::<f64>() < config::HNSW_LEVEL_PROBABILITY
        && level < config::HNSW_MAX_LEVEL
    {
        level += 1;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit(dim: usize, idx: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[idx] = 1.0;
        v
    }

    #[test]
    fn new_index_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(VectorStore::open(dir.path().join("v.bin"), 4).unwrap());
        let index = HnswIndex::new(store);
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn clear_drops_graph_but_not_store() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(VectorStore::open(dir.path().join("v.bin"), 4).unwrap());
        let index = HnswIndex::new(Arc::clone(&store));

        for i in 0..3 {
            let v = unit(4, i);
            let id = store.append(&v).unwrap();
            index.add(id, &v).unwrap();
        }
        assert_eq!(index.len(), 3);

        index.clear();
        assert_eq!(index.len(), 0);
        assert!(index.search(&unit(4, 0), 1).unwrap().is_empty());
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn rebuild_replays_store_in_order() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(VectorStore::open(dir.path().join("v.bin"), 4).unwrap());
        for i in 0..4 {
            store.append(&unit(4, i)).unwrap();
        }

        let index = HnswIndex::new(Arc::clone(&store));
        assert_eq!(index.rebuild().unwrap(), 4);
        assert_eq!(index.len(), 4);

        let results = index.search(&unit(4, 2), 1).unwrap();
        assert_eq!(results[0].0, 2);
        assert_eq!(results[0].1, 0.0);
    }

    #[test]
    fn random_level_respects_cap() {
        for _ in 0..1000 {
            assert!(random_level() <= config::HNSW_MAX_LEVEL);
        }
    }
}
