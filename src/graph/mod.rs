//! In-memory graph cache for O(1) neighbor lookups during activation
//! spreading.
//!
//! A single owned value behind a read-write lock, no hidden globals — the
//! same shape as the teacher's `Mutex`-guarded connection, applied here to
//! an adjacency map instead of a database handle.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::{Edge, Neighbor};

/// Adjacency cache mapping a note id to its outgoing edges.
pub struct GraphCache {
    adjacency: RwLock<HashMap<i64, Vec<Neighbor>>>,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            adjacency: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the cache's contents wholesale from a list of directed edges
    /// (callers are expected to pass both directions of every stored pair).
    pub fn rebuild(&self, edges: &[Edge]) {
        let mut map: HashMap<i64, Vec<Neighbor>> = HashMap::new();
        for edge in edges {
            map.entry(edge.source_id).or_default().push(Neighbor {
                neighbor_id: edge.target_id,
                weight: edge.weight,
                edge_type: edge.edge_type,
            });
        }
        let mut guard = self
            .adjacency
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = map;
    }

    /// Add one directed edge to the cache (the caller is responsible for
    /// calling this once per direction of a symmetric pair).
    pub fn add_edge(&self, edge: &Edge) {
        let mut guard = self
            .adjacency
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.entry(edge.source_id).or_default().push(Neighbor {
            neighbor_id: edge.target_id,
            weight: edge.weight,
            edge_type: edge.edge_type,
        });
    }

    /// Drop every edge touching `note_id`, as either endpoint. Used when a
    /// note is deleted.
    pub fn remove_edges_for(&self, note_id: i64) {
        let mut guard = self
            .adjacency
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&note_id);
        for neighbors in guard.values_mut() {
            neighbors.retain(|n| n.neighbor_id != note_id);
        }
    }

    /// Outgoing neighbors of `note_id`, or an empty vec if it has none.
    pub fn neighbors(&self, note_id: i64) -> Vec<Neighbor> {
        let guard = self
            .adjacency
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(&note_id).cloned().unwrap_or_default()
    }

    /// Total number of directed edges currently cached.
    pub fn edge_count(&self) -> usize {
        let guard = self
            .adjacency
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.values().map(|v| v.len()).sum()
    }
}
