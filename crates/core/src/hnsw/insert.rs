//! HNSW insertion.
//!
//! Inserts descend greedily to the new node's level, then run a beam of
//! width `EF_CONSTRUCTION` per layer, linking the new node to the top
//! `M` (`M0` at layer 0) results bidirectionally.

use crate::config;
use crate::error::Result;
use crate::hnsw::graph::{random_level, HnswIndex, Node};
use crate::hnsw::search::search_layer;
use crate::hnsw::visited::with_visited;

impl HnswIndex {
    /// Inserts the vector stored at `id` into the graph.
    ///
    /// `vector` must be the value stored at `id`; it is passed in so the
    /// ingest path avoids an immediate read-back of the vector it just
    /// appended. Insertion order must match store order when replaying.
    pub fn add(&self, id: u64, vector: &[f32]) -> Result<()> {
        let mut graph = self.graph.write();
        let level = random_level();

        let Some(entry_point) = graph.entry_point else {
            graph.nodes.insert(id, Node::new(level));
            graph.entry_point = Some(id);
            graph.max_level = level;
            return Ok(());
        };

        graph.nodes.insert(id, Node::new(level));

        with_visited(|visited| {
            // Greedy descent: land on the nearest neighbor at each layer
            // above the new node's level.
            let mut current_ep = entry_point;
            for layer in (level + 1..=graph.max_level).rev() {
                let found = search_layer(
                    &graph,
                    &self.vectors,
                    vector,
                    &[current_ep],
                    1,
                    layer,
                    visited,
                )?;
                if let Some(&(_, nearest)) = found.first() {
                    current_ep = nearest;
                }
            }

            // Link layers from min(level, max_level) down to 0.
            let top = level.min(graph.max_level);
            for layer in (0..=top).rev() {
                let found = search_layer(
                    &graph,
                    &self.vectors,
                    vector,
                    &[current_ep],
                    config::HNSW_EF_CONSTRUCTION,
                    layer,
                    visited,
                )?;

                let m_max = if layer == 0 {
                    config::HNSW_M0
                } else {
                    config::HNSW_M
                };
                let selected: Vec<u64> =
                    found.iter().take(m_max).map(|&(_, nid)| nid).collect();

                if let Some(node) = graph.nodes.get_mut(&id) {
                    node.neighbors[layer] = selected.clone();
                }
                for &neighbor_id in &selected {
                    if let Some(neighbor) = graph.nodes.get_mut(&neighbor_id) {
                        while neighbor.neighbors.len() <= layer {
                            neighbor.neighbors.push(Vec::new());
                        }
                        neighbor.neighbors[layer].push(id);
                    }
                }

                if let Some(&(_, best)) = found.first() {
                    current_ep = best;
                }
            }

            Ok::<(), crate::error::Error>(())
        })?;

        if level > graph.max_level {
            graph.max_level = level;
            graph.entry_point = Some(id);
        }

        Ok(())
    }
}
