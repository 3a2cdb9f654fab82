//! HNSW search: greedy descent through the upper layers and a
//! breadth-limited beam search at the target layer.
//!
//! Both insertion and query go through [`search_layer`]; insertion runs
//! it with `ef = EF_CONSTRUCTION` per layer, query descends with a width
//! of 1 and finishes with `ef = EF_SEARCH` at layer 0.

use crate::config;
use crate::error::Result;
use crate::hnsw::distance::euclidean;
use crate::hnsw::graph::{Graph, HnswIndex};
use crate::hnsw::visited::{with_visited, VisitedSet};
use crate::storage::VectorStore;
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// An expansion candidate: max-heap on negative distance gives min-heap
/// behavior (closest candidate pops first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    neg_distance: OrderedFloat<f32>,
    id: u64,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.neg_distance.cmp(&other.neg_distance)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A kept result: max-heap on distance, so the worst survivor pops first
/// when the beam overflows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    id: u64,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance.cmp(&other.distance)
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Beam search of width `ef` over a single layer.
///
/// Returns up to `ef` `(distance, id)` pairs in ascending-distance order.
/// `visited` is reused across calls and cleared on entry.
pub(crate) fn search_layer(
    graph: &Graph,
    vectors: &VectorStore,
    query: &[f32],
    entry_points: &[u64],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Result<Vec<(f32, u64)>> {
    visited.clear();
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(ef * 2);
    let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(ef + 1);

    for &ep in entry_points {
        if visited.insert(ep) {
            let dist = euclidean(query, &vectors.get(ep)?);
            candidates.push(Candidate {
                neg_distance: OrderedFloat(-dist),
                id: ep,
            });
            results.push(ResultEntry {
                distance: OrderedFloat(dist),
                id: ep,
            });
        }
    }

    while let Some(candidate) = candidates.pop() {
        let c_dist = -candidate.neg_distance.0;

        // The closest unexpanded candidate is already farther than the
        // worst kept result: the beam cannot improve.
        if results.len() >= ef {
            let worst = results.peek().map_or(f32::MAX, |r| r.distance.0);
            if c_dist > worst {
                break;
            }
        }

        let Some(node) = graph.nodes.get(&candidate.id) else {
            continue;
        };
        let Some(neighbor_list) = node.neighbors.get(layer) else {
            continue;
        };

        for &neighbor_id in neighbor_list {
            if !visited.insert(neighbor_id) {
                continue;
            }
            let dist = euclidean(query, &vectors.get(neighbor_id)?);
            let worst = results.peek().map_or(f32::MAX, |r| r.distance.0);
            if results.len() < ef || dist < worst {
                candidates.push(Candidate {
                    neg_distance: OrderedFloat(-dist),
                    id: neighbor_id,
                });
                results.push(ResultEntry {
                    distance: OrderedFloat(dist),
                    id: neighbor_id,
                });
                if results.len() > ef {
                    results.pop();
                }
            }
        }
    }

    Ok(results
        .into_sorted_vec()
        .into_iter()
        .map(|r| (r.distance.0, r.id))
        .collect())
}

impl HnswIndex {
    /// K-nearest-neighbor search.
    ///
    /// Descends greedily from the top layer to layer 1 to find a good
    /// entry point, then runs the layer-0 beam with width
    /// [`config::HNSW_EF_SEARCH`]. Returns up to `k` `(id, distance)`
    /// pairs in ascending-distance order; an empty index returns an
    /// empty vec.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u64, f32)>> {
        let graph = self.graph.read();
        let Some(entry_point) = graph.entry_point else {
            return Ok(Vec::new());
        };

        with_visited(|visited| {
            let mut current_ep = entry_point;
            for layer in (1..=graph.max_level).rev() {
                let found = search_layer(
                    &graph,
                    &self.vectors,
                    query,
                    &[current_ep],
                    1,
                    layer,
                    visited,
                )?;
                if let Some(&(_, nearest)) = found.first() {
                    current_ep = nearest;
                }
            }

            let found = search_layer(
                &graph,
                &self.vectors,
                query,
                &[current_ep],
                config::HNSW_EF_SEARCH,
                0,
                visited,
            )?;

            Ok(found
                .into_iter()
                .take(k)
                .map(|(dist, id)| (id, dist))
                .collect())
        })
    }
}
