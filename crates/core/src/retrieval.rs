//! Retrieval engine.
//!
//! One operation: ask the ANN index for candidates, hydrate them from the
//! metadata store, filter by namespace, score by similarity and recency,
//! then greedily pack the ranked chunks into the caller's token budget.

use crate::config;
use crate::error::{Error, Result};
use crate::hnsw::HnswIndex;
use crate::storage::{MetadataStore, VectorStore};
use crate::types::Chunk;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Recency score used when a candidate's document is missing and no
/// namespace filter is active.
const DEFAULT_RECENCY: f32 = 0.5;

/// Per-request retrieval parameters.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Token budget for the packed result set.
    pub max_tokens: u32,
    /// ANN candidates fetched before metadata lookup and re-ranking.
    pub top_k_candidates: usize,
    /// Weight of the similarity term; non-negative, sums to 1 with
    /// `recency_weight`.
    pub similarity_weight: f32,
    /// Weight of the recency term.
    pub recency_weight: f32,
    /// Optional partition filter: only chunks whose owning document
    /// carries this `namespace` metadata value are returned.
    pub namespace: Option<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_tokens: config::DEFAULT_MAX_TOKENS,
            top_k_candidates: config::DEFAULT_TOP_K_CANDIDATES,
            similarity_weight: config::DEFAULT_SIMILARITY_WEIGHT,
            recency_weight: config::DEFAULT_RECENCY_WEIGHT,
            namespace: None,
        }
    }
}

/// A chunk admitted into the result set.
///
/// `similarity` carries the combined final score the ranking used;
/// `recency` the recency component on its own.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub similarity: f32,
    pub recency: f32,
}

/// The packed, ranked result of one retrieval.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    /// Admitted chunks in descending final-score order.
    pub chunks: Vec<ScoredChunk>,
    /// Sum of `token_count` across admitted chunks; never exceeds the
    /// request budget.
    pub total_tokens: u32,
    /// `true` when at least one candidate was dropped for budget reasons.
    pub truncated: bool,
}

/// Ties the ANN index and the two stores together into the retrieval
/// operation.
pub struct Retriever {
    index: Arc<HnswIndex>,
    vectors: Arc<VectorStore>,
    metadata: Arc<MetadataStore>,
}

impl Retriever {
    pub fn new(
        index: Arc<HnswIndex>,
        vectors: Arc<VectorStore>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self {
            index,
            vectors,
            metadata,
        }
    }

    /// Runs one retrieval.
    ///
    /// Candidates whose chunk record is missing are skipped silently;
    /// candidates failing the namespace filter are dropped. A missing
    /// document without an active namespace filter falls back to
    /// [`DEFAULT_RECENCY`]. Ranking ties are broken by chunk id
    /// ascending, which keeps the operation deterministic for a fixed
    /// store state.
    pub fn retrieve(&self, query: &[f32], cfg: &RetrievalConfig) -> Result<RetrievalResult> {
        if query.len() != self.vectors.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.vectors.dim(),
                got: query.len(),
            });
        }

        let candidates = self.index.search(query, cfg.top_k_candidates)?;
        let now = Utc::now();

        let mut scored: Vec<ScoredChunk> = Vec::with_capacity(candidates.len());
        for (id, distance) in candidates {
            let chunk = match self.metadata.get_chunk(id) {
                Ok(chunk) => chunk,
                Err(Error::ChunkNotFound(_)) => continue,
                Err(e) => return Err(e),
            };

            let doc = match self.metadata.get_document(&chunk.doc_id) {
                Ok(doc) => Some(doc),
                Err(Error::DocumentNotFound(_)) => None,
                Err(e) => return Err(e),
            };

            if let Some(ns) = cfg.namespace.as_deref() {
                match doc.as_ref().and_then(|d| d.namespace()) {
                    Some(doc_ns) if doc_ns == ns => {}
                    _ => continue,
                }
            }

            let sim_score = 1.0 / (1.0 + distance);
            let recency = doc
                .as_ref()
                .map(|d| recency_score(d.timestamp, now))
                .unwrap_or(DEFAULT_RECENCY);
            let final_score =
                sim_score * cfg.similarity_weight + recency * cfg.recency_weight;

            scored.push(ScoredChunk {
                chunk,
                similarity: final_score,
                recency,
            });
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });

        let mut result = RetrievalResult::default();
        for cand in scored {
            if result.total_tokens + cand.chunk.token_count > cfg.max_tokens {
                // A later, smaller candidate may still fit.
                result.truncated = true;
                continue;
            }
            result.total_tokens += cand.chunk.token_count;
            result.chunks.push(cand);
        }

        Ok(result)
    }
}

/// Smoothly decaying age score: 1 at zero age, 0.5 after one day.
fn recency_score(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let hours = (now - timestamp).num_milliseconds() as f32 / 3_600_000.0;
    1.0 / (1.0 + hours / 24.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Document, MetadataValue};
    use chrono::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        vectors: Arc<VectorStore>,
        metadata: Arc<MetadataStore>,
        index: Arc<HnswIndex>,
    }

    impl Fixture {
        fn new(dim: usize) -> Self {
            let dir = TempDir::new().unwrap();
            let vectors =
                Arc::new(VectorStore::open(dir.path().join("vectors.bin"), dim).unwrap());
            let metadata =
                Arc::new(MetadataStore::open(dir.path().join("metadata.db")).unwrap());
            let index = Arc::new(HnswIndex::new(Arc::clone(&vectors)));
            Self {
                _dir: dir,
                vectors,
                metadata,
                index,
            }
        }

        fn retriever(&self) -> Retriever {
            Retriever::new(
                Arc::clone(&self.index),
                Arc::clone(&self.vectors),
                Arc::clone(&self.metadata),
            )
        }

        fn ingest_doc(
            &self,
            doc_id: &str,
            namespace: Option<&str>,
            age: Duration,
            vector: &[f32],
            token_count: u32,
        ) -> u64 {
            let mut metadata = std::collections::HashMap::new();
            if let Some(ns) = namespace {
                metadata.insert("namespace".to_string(), MetadataValue::from(ns));
            }
            self.metadata
                .save_document(&Document {
                    id: doc_id.to_string(),
                    source: "test".to_string(),
                    timestamp: Utc::now() - age,
                    metadata,
                })
                .unwrap();

            let id = self.vectors.append(vector).unwrap();
            self.metadata
                .save_chunk(&Chunk {
                    id,
                    doc_id: doc_id.to_string(),
                    content: format!("chunk of {doc_id}"),
                    start_line: 0,
                    end_line: 0,
                    token_count,
                })
                .unwrap();
            self.index.add(id, vector).unwrap();
            id
        }
    }

    fn unit(dim: usize, idx: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[idx] = 1.0;
        v
    }

    #[test]
    fn empty_store_yields_empty_result() {
        let fx = Fixture::new(4);
        let res = fx
            .retriever()
            .retrieve(&unit(4, 0), &RetrievalConfig::default())
            .unwrap();
        assert!(res.chunks.is_empty());
        assert_eq!(res.total_tokens, 0);
        assert!(!res.truncated);
    }

    #[test]
    fn query_dimension_is_validated() {
        let fx = Fixture::new(4);
        assert!(matches!(
            fx.retriever()
                .retrieve(&[1.0, 0.0], &RetrievalConfig::default()),
            Err(Error::DimensionMismatch {
                expected: 4,
                got: 2
            })
        ));
    }

    #[test]
    fn round_trip_single_chunk() {
        let fx = Fixture::new(4);
        fx.ingest_doc("doc-A", None, Duration::zero(), &unit(4, 0), 10);

        let res = fx
            .retriever()
            .retrieve(&unit(4, 0), &RetrievalConfig::default())
            .unwrap();
        assert_eq!(res.chunks.len(), 1);
        assert_eq!(res.chunks[0].chunk.doc_id, "doc-A");
        assert_eq!(res.total_tokens, 10);
        assert!(!res.truncated);
        // Exact match, fresh document: sim = 1, recency ≈ 1.
        assert!(res.chunks[0].similarity > 0.95);
    }

    #[test]
    fn namespace_filter_isolates_partitions() {
        let fx = Fixture::new(4);
        fx.ingest_doc("doc-X", Some("proj1"), Duration::zero(), &unit(4, 0), 10);
        fx.ingest_doc("doc-Y", Some("proj2"), Duration::zero(), &unit(4, 1), 10);

        let cfg = RetrievalConfig {
            namespace: Some("proj1".to_string()),
            ..RetrievalConfig::default()
        };
        let res = fx.retriever().retrieve(&unit(4, 0), &cfg).unwrap();
        assert_eq!(res.chunks.len(), 1);
        assert_eq!(res.chunks[0].chunk.doc_id, "doc-X");

        let cfg = RetrievalConfig {
            namespace: Some("proj2".to_string()),
            ..cfg
        };
        let res = fx.retriever().retrieve(&unit(4, 0), &cfg).unwrap();
        assert_eq!(res.chunks.len(), 1);
        assert_eq!(res.chunks[0].chunk.doc_id, "doc-Y");
    }

    #[test]
    fn namespace_filter_drops_documentless_chunks() {
        let fx = Fixture::new(4);
        // Chunk whose doc_id resolves to nothing.
        let id = fx.vectors.append(&unit(4, 0)).unwrap();
        fx.metadata
            .save_chunk(&Chunk {
                id,
                doc_id: "ghost".to_string(),
                content: "orphan".to_string(),
                start_line: 0,
                end_line: 0,
                token_count: 5,
            })
            .unwrap();
        fx.index.add(id, &unit(4, 0)).unwrap();

        let cfg = RetrievalConfig {
            namespace: Some("proj1".to_string()),
            ..RetrievalConfig::default()
        };
        assert!(fx.retriever().retrieve(&unit(4, 0), &cfg).unwrap().chunks.is_empty());

        // Without a filter the orphan survives with the fallback recency.
        let res = fx
            .retriever()
            .retrieve(&unit(4, 0), &RetrievalConfig::default())
            .unwrap();
        assert_eq!(res.chunks.len(), 1);
        assert_eq!(res.chunks[0].recency, DEFAULT_RECENCY);
    }

    #[test]
    fn missing_chunk_record_is_skipped() {
        let fx = Fixture::new(4);
        // Vector indexed but no chunk row written.
        let id = fx.vectors.append(&unit(4, 0)).unwrap();
        fx.index.add(id, &unit(4, 0)).unwrap();
        fx.ingest_doc("doc-A", None, Duration::zero(), &unit(4, 1), 10);

        let res = fx
            .retriever()
            .retrieve(&unit(4, 0), &RetrievalConfig::default())
            .unwrap();
        assert_eq!(res.chunks.len(), 1);
        assert_eq!(res.chunks[0].chunk.doc_id, "doc-A");
    }

    #[test]
    fn budget_packing_skips_oversized_and_flags_truncation() {
        let fx = Fixture::new(4);
        let mut big = unit(4, 0);
        big[1] = 0.01;
        fx.ingest_doc("doc-big", None, Duration::zero(), &big, 200);
        let mut small = unit(4, 0);
        small[1] = 0.02;
        fx.ingest_doc("doc-small", None, Duration::zero(), &small, 100);

        let cfg = RetrievalConfig {
            max_tokens: 150,
            ..RetrievalConfig::default()
        };
        let res = fx.retriever().retrieve(&unit(4, 0), &cfg).unwrap();
        assert_eq!(res.chunks.len(), 1);
        assert_eq!(res.chunks[0].chunk.doc_id, "doc-small");
        assert_eq!(res.total_tokens, 100);
        assert!(res.truncated);
    }

    #[test]
    fn fresher_document_outranks_older_with_identical_vectors() {
        let fx = Fixture::new(4);
        fx.ingest_doc("doc-old", None, Duration::hours(24), &unit(4, 0), 10);
        fx.ingest_doc("doc-new", None, Duration::zero(), &unit(4, 0), 10);

        let res = fx
            .retriever()
            .retrieve(&unit(4, 0), &RetrievalConfig::default())
            .unwrap();
        assert_eq!(res.chunks.len(), 2);
        assert_eq!(res.chunks[0].chunk.doc_id, "doc-new");
        assert_eq!(res.chunks[1].chunk.doc_id, "doc-old");
        assert!(res.chunks[0].recency > res.chunks[1].recency);
    }

    #[test]
    fn score_ties_break_by_chunk_id() {
        let fx = Fixture::new(4);
        let ts = Utc::now();
        for doc_id in ["doc-b", "doc-a"] {
            fx.metadata
                .save_document(&Document {
                    id: doc_id.to_string(),
                    source: "test".to_string(),
                    timestamp: ts,
                    metadata: Default::default(),
                })
                .unwrap();
            let id = fx.vectors.append(&unit(4, 0)).unwrap();
            fx.metadata
                .save_chunk(&Chunk {
                    id,
                    doc_id: doc_id.to_string(),
                    content: String::new(),
                    start_line: 0,
                    end_line: 0,
                    token_count: 1,
                })
                .unwrap();
            fx.index.add(id, &unit(4, 0)).unwrap();
        }

        let res = fx
            .retriever()
            .retrieve(&unit(4, 0), &RetrievalConfig::default())
            .unwrap();
        let ids: Vec<u64> = res.chunks.iter().map(|c| c.chunk.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn recency_score_halves_after_a_day() {
        let now = Utc::now();
        assert_eq!(recency_score(now, now), 1.0);
        let day_old = recency_score(now - Duration::hours(24), now);
        assert!((day_old - 0.5).abs() < 1e-3);
        let week_old = recency_score(now - Duration::days(7), now);
        assert!(week_old < day_old);
    }
}
