//! Approximate nearest-neighbor index over note embeddings.
//!
//! Wraps `usearch`'s HNSW index the way the teacher's vector search module
//! does, generalized from string keys to the engine's native `i64` note ids
//! and from a fixed compile-time dimension constant to a runtime width fixed
//! at construction. Search over-fetches `2k` candidates before the
//! min-similarity filter and limit truncation to compensate for HNSW's
//! approximate recall, mirroring the over-fetch pattern in the reference
//! FAISS-backed index.

use std::collections::HashMap;

#[cfg(feature = "vector-search")]
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::config::AnnIndexKind;

/// HNSW connectivity parameter (higher = better recall, more memory).
pub const DEFAULT_CONNECTIVITY: usize = 16;
/// HNSW expansion factor used while building the index.
pub const DEFAULT_EXPANSION_ADD: usize = 128;
/// HNSW expansion factor used while searching the index.
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

/// ANN index error types.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexError {
    #[error("index creation failed: {0}")]
    Creation(String),
    #[error("failed to add vector: {0}")]
    Add(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("invalid dimensions: expected {0}, got {1}")]
    InvalidDimensions(usize, usize),
}

/// Index statistics, exposed for bootstrap logging and diagnostics.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimensions: usize,
    pub enabled: bool,
}

/// ANN index over note embeddings, keyed by note id.
///
/// When `enabled` is false (per [`AnnIndexKind::Disabled`]), `build`/`add`
/// are no-ops and `search` always returns empty; callers fall back to a
/// linear scan over the store, exactly as the reference implementation does
/// when its `USE_ANN_INDEX` flag is off.
pub struct AnnIndex {
    #[cfg(feature = "vector-search")]
    index: Option<Index>,
    dimensions: usize,
    enabled: bool,
    /// Map from usearch's internal u64 key back to our native note id;
    /// usearch keys are u64 so negative note ids (never produced by
    /// `AUTOINCREMENT`, but defensively handled) would not round-trip, this
    /// map sidesteps that rather than relying on bit-casting.
    key_to_id: HashMap<u64, i64>,
    id_to_key: HashMap<i64, u64>,
    next_key: u64,
}

impl AnnIndex {
    /// Create a new index for `dimensions`-wide vectors, per `kind`.
    pub fn new(dimensions: usize, kind: AnnIndexKind) -> Result<Self, IndexError> {
        let enabled = matches!(kind, AnnIndexKind::Hnsw);

        #[cfg(feature = "vector-search")]
        let index = if enabled {
            let options = IndexOptions {
                dimensions,
                metric: MetricKind::Cos,
                quantization: ScalarKind::I8,
                connectivity: DEFAULT_CONNECTIVITY,
                expansion_add: DEFAULT_EXPANSION_ADD,
                expansion_search: DEFAULT_EXPANSION_SEARCH,
                multi: false,
            };
            Some(Index::new(&options).map_err(|e| IndexError::Creation(e.to_string()))?)
        } else {
            None
        };

        #[cfg(not(feature = "vector-search"))]
        let enabled = false;

        Ok(Self {
            #[cfg(feature = "vector-search")]
            index,
            dimensions,
            enabled,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            next_key: 0,
        })
    }

    /// Whether this index is actually being maintained.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Number of vectors currently indexed.
    pub fn len(&self) -> usize {
        self.id_to_key.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bulk-load `(note_id, embedding)` pairs, replacing any existing
    /// contents. Used during bootstrap/rebuild. Vectors whose length doesn't
    /// match `dimensions` are skipped (logged) rather than failing the whole
    /// build. Returns the number of vectors actually indexed.
    #[cfg_attr(not(feature = "vector-search"), allow(unused_variables))]
    pub fn build(&mut self, vectors: &[(i64, Vec<f32>)]) -> Result<usize, IndexError> {
        if !self.enabled {
            return Ok(0);
        }
        self.key_to_id.clear();
        self.id_to_key.clear();
        self.next_key = 0;

        let mut indexed = 0;
        #[cfg(feature = "vector-search")]
        {
            let idx = self.index.as_ref().expect("enabled index always has an Index");
            idx.reserve(vectors.len().max(16))
                .map_err(|e| IndexError::Creation(e.to_string()))?;
            for (id, vector) in vectors {
                if vector.len() != self.dimensions {
                    tracing::warn!(
                        note_id = id,
                        expected = self.dimensions,
                        got = vector.len(),
                        "skipping vector with mismatched dimensions during index build"
                    );
                    continue;
                }
                self.add(*id, vector)?;
                indexed += 1;
            }
        }
        Ok(indexed)
    }

    /// Add or replace a single vector.
    pub fn add(&mut self, note_id: i64, vector: &[f32]) -> Result<(), IndexError> {
        if !self.enabled {
            return Ok(());
        }
        if vector.len() != self.dimensions {
            return Err(IndexError::InvalidDimensions(self.dimensions, vector.len()));
        }

        #[cfg(feature = "vector-search")]
        {
            let idx = self.index.as_ref().expect("enabled index always has an Index");

            if let Some(&existing_key) = self.id_to_key.get(&note_id) {
                idx.remove(existing_key)
                    .map_err(|e| IndexError::Add(e.to_string()))?;
                idx.add(existing_key, vector)
                    .map_err(|e| IndexError::Add(e.to_string()))?;
                return Ok(());
            }

            let capacity = idx.capacity();
            let size = idx.size();
            if size >= capacity {
                idx.reserve(std::cmp::max(capacity * 2, 16))
                    .map_err(|e| IndexError::Creation(e.to_string()))?;
            }

            let key = self.next_key;
            self.next_key += 1;
            idx.add(key, vector).map_err(|e| IndexError::Add(e.to_string()))?;
            self.key_to_id.insert(key, note_id);
            self.id_to_key.insert(note_id, key);
        }
        Ok(())
    }

    /// Remove a note's vector, if present.
    pub fn remove(&mut self, note_id: i64) -> Result<(), IndexError> {
        if !self.enabled {
            return Ok(());
        }
        #[cfg(feature = "vector-search")]
        if let Some(key) = self.id_to_key.remove(&note_id) {
            self.key_to_id.remove(&key);
            let idx = self.index.as_ref().expect("enabled index always has an Index");
            idx.remove(key).map_err(|e| IndexError::Add(e.to_string()))?;
        }
        Ok(())
    }

    /// Search for the `k` nearest neighbors of `query` with similarity at or
    /// above `min_similarity`. Over-fetches `2k` from the underlying HNSW
    /// index before filtering and truncating, compensating for approximate
    /// recall.
    #[cfg_attr(not(feature = "vector-search"), allow(unused_variables))]
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        min_similarity: f32,
    ) -> Result<Vec<(i64, f32)>, IndexError> {
        if !self.enabled || self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(IndexError::InvalidDimensions(self.dimensions, query.len()));
        }

        #[cfg(feature = "vector-search")]
        {
            let idx = self.index.as_ref().expect("enabled index always has an Index");
            let over_fetch = (k * 2).max(k).min(self.len());
            let results = idx
                .search(query, over_fetch)
                .map_err(|e| IndexError::Search(e.to_string()))?;

            let mut out = Vec::with_capacity(results.keys.len());
            for (key, distance) in results.keys.iter().zip(results.distances.iter()) {
                if let Some(&note_id) = self.key_to_id.get(key) {
                    let similarity = 1.0 - distance;
                    if similarity >= min_similarity {
                        out.push((note_id, similarity));
                    }
                }
            }
            out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            out.truncate(k);
            return Ok(out);
        }

        #[cfg(not(feature = "vector-search"))]
        Ok(Vec::new())
    }

    /// Current statistics, for bootstrap logging.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_vectors: self.len(),
            dimensions: self.dimensions,
            enabled: self.enabled,
        }
    }
}

#[cfg(all(test, feature = "vector-search"))]
mod tests {
    use super::*;

    fn vec_for(seed: f32, dims: usize) -> Vec<f32> {
        (0..dims).map(|i| ((i as f32 + seed) * 0.1).sin()).collect()
    }

    #[test]
    fn disabled_index_search_returns_empty() {
        let mut index = AnnIndex::new(8, AnnIndexKind::Disabled).unwrap();
        index.add(1, &vec_for(1.0, 8)).unwrap();
        assert!(index.search(&vec_for(1.0, 8), 5, 0.0).unwrap().is_empty());
    }

    #[test]
    fn add_and_search_finds_self() {
        let mut index = AnnIndex::new(16, AnnIndexKind::Hnsw).unwrap();
        let v1 = vec_for(1.0, 16);
        let v2 = vec_for(50.0, 16);
        index.add(1, &v1).unwrap();
        index.add(2, &v2).unwrap();

        let results = index.search(&v1, 2, 0.0).unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].0, 1);
    }

    #[test]
    fn remove_drops_vector() {
        let mut index = AnnIndex::new(8, AnnIndexKind::Hnsw).unwrap();
        index.add(1, &vec_for(1.0, 8)).unwrap();
        assert_eq!(index.len(), 1);
        index.remove(1).unwrap();
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn wrong_dimensions_rejected() {
        let mut index = AnnIndex::new(16, AnnIndexKind::Hnsw).unwrap();
        assert!(index.add(1, &vec![1.0, 2.0]).is_err());
    }
}
