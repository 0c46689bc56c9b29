//! The related operations named in §4.6: `find_similar`, `get_graph`,
//! `update_note`, `delete_note`, and `set_importance`, plus `stats` (§6
//! operation surface, diagnostics only).

use crate::engine::MemoryEngine;
use crate::entities::ExtractedEntity;
use crate::error::{EngineError, Result};
use crate::index::IndexStats;
use crate::model::{EdgeType, Importance, Neighbor, Note};

/// One hit from [`MemoryEngine::find_similar`].
#[derive(Debug, Clone)]
pub struct SimilarNote {
    pub note_id: i64,
    pub similarity: f32,
    /// First 200 characters of the matched note's content.
    pub preview: String,
}

/// A note together with its cached graph neighbors, returned by
/// [`MemoryEngine::get_graph`].
#[derive(Debug, Clone)]
pub struct NoteGraph {
    pub note: Note,
    pub neighbors: Vec<Neighbor>,
}

/// Aggregate counters returned by [`MemoryEngine::stats`].
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub note_count: usize,
    pub edge_count: usize,
    pub index: IndexStats,
}

impl MemoryEngine {
    /// Embed `content` and return notes at or above `threshold` similarity,
    /// most similar first. Read-only: no access-count side effect.
    pub fn find_similar(&self, content: &str, threshold: f32, limit: usize) -> Result<Vec<SimilarNote>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidArgument(
                "threshold must be within [0, 1]".to_string(),
            ));
        }

        let embedding = self.embedding_provider.embed(content)?;
        let hits = {
            let index = self
                .index
                .lock()
                .map_err(|_| EngineError::Transient("index lock poisoned".to_string()))?;
            if index.enabled() && !index.is_empty() {
                index.search(&embedding, limit, threshold)?
            } else {
                drop(index);
                self.linear_scan_similar(&embedding, threshold)?
                    .into_iter()
                    .take(limit)
                    .collect()
            }
        };

        let mut results = Vec::with_capacity(hits.len());
        for (id, similarity) in hits {
            let note = self.store.get_note(id)?;
            results.push(SimilarNote {
                note_id: id,
                similarity,
                preview: note.content.chars().take(200).collect(),
            });
        }
        Ok(results)
    }

    /// A note's stored summary plus its cached adjacency list.
    pub fn get_graph(&self, id: i64) -> Result<NoteGraph> {
        let note = self.store.get_note(id)?;
        let neighbors = self.graph.neighbors(id);
        Ok(NoteGraph { note, neighbors })
    }

    /// Update a note's content and/or category. Re-embeds and swaps the ANN
    /// vector when content changes, and fully re-derives this note's edges
    /// (both entity and semantic) in that case — spec.md treats a full
    /// re-link as acceptable rather than requiring incremental entity-edge
    /// maintenance. `last_accessed` is left untouched.
    pub fn update_note(&self, id: i64, content: Option<&str>, category: Option<&str>) -> Result<Note> {
        if let Some(c) = content {
            if c.trim().is_empty() {
                return Err(EngineError::InvalidArgument(
                    "content must not be empty".to_string(),
                ));
            }
        }

        let updated = self.store.update_note(id, content, category)?;

        if let Some(new_content) = content {
            let embedding = self.embedding_provider.embed(new_content)?;
            self.store.update_embedding(id, &embedding)?;

            {
                let mut index = self
                    .index
                    .lock()
                    .map_err(|_| EngineError::Transient("index lock poisoned".to_string()))?;
                index.remove(id)?;
                index.add(id, &embedding)?;
            }

            self.store.remove_edges_for(id)?;
            self.store.remove_entity_links_for(id)?;
            self.graph.remove_edges_for(id);

            let entities: Vec<ExtractedEntity> = self.entity_extractor.extract(new_content);
            for entity in &entities {
                let stored = self.store.get_or_create_entity(&entity.name, entity.entity_type)?;
                self.store.link_note_to_entity(id, stored.id)?;
                for related in self.store.get_notes_by_entity(stored.id)? {
                    if related.id == id {
                        continue;
                    }
                    self.link_pair(id, related.id, 0.6, EdgeType::Entity)?;
                }
            }

            let candidates = {
                let index = self
                    .index
                    .lock()
                    .map_err(|_| EngineError::Transient("index lock poisoned".to_string()))?;
                if index.enabled() {
                    index.search(
                        &embedding,
                        self.config.max_semantic_links * 2,
                        self.config.similarity_threshold,
                    )?
                } else {
                    drop(index);
                    self.linear_scan_similar(&embedding, self.config.similarity_threshold)?
                }
            };
            for (candidate_id, similarity) in candidates
                .into_iter()
                .filter(|(cid, _)| *cid != id)
                .take(self.config.max_semantic_links)
            {
                self.link_pair(id, candidate_id, similarity, EdgeType::Semantic)?;
            }
        }

        self.store.get_note(updated.id).map_err(EngineError::from)
    }

    /// Delete a note and every edge mentioning it, in the store, the ANN
    /// index, and the graph cache.
    pub fn delete_note(&self, id: i64) -> Result<()> {
        {
            let mut index = self
                .index
                .lock()
                .map_err(|_| EngineError::Transient("index lock poisoned".to_string()))?;
            index.remove(id)?;
        }
        self.graph.remove_edges_for(id);
        self.store.delete_note(id)?;
        Ok(())
    }

    /// Update a note's importance tier; no structural effects.
    pub fn set_importance(&self, id: i64, level: Importance) -> Result<Note> {
        self.store.set_importance(id, level).map_err(EngineError::from)
    }

    /// Aggregate counters over the current store and ANN index, for
    /// diagnostics/operational reporting.
    pub fn stats(&self) -> Result<EngineStats> {
        let note_count = self.store.get_all_notes()?.len();
        let edge_count = self.store.get_all_edges()?.len();
        let index = self
            .index
            .lock()
            .map_err(|_| EngineError::Transient("index lock poisoned".to_string()))?
            .stats();
        Ok(EngineStats {
            note_count,
            edge_count,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteInput;

    fn input(content: &str) -> NoteInput {
        NoteInput {
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn find_similar_rejects_out_of_range_threshold() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let err = engine.find_similar("anything", 1.5, 5).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn find_similar_matches_closely_related_content() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        engine.add_note(input("deploying rust services with docker")).unwrap();
        let hits = engine.find_similar("deploying rust services with docker", 0.9, 5).unwrap();
        assert!(!hits.is_empty());
    }

    #[test]
    fn get_graph_returns_cached_neighbors() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let a = engine.add_note(input("shared topic about rust and databases")).unwrap().note;
        let b = engine
            .add_note(input("another note about rust and databases too"))
            .unwrap()
            .note;

        let graph = engine.get_graph(a.id).unwrap();
        assert_eq!(graph.note.id, a.id);
        assert!(graph.neighbors.iter().any(|n| n.neighbor_id == b.id));
    }

    #[test]
    fn delete_note_removes_from_graph_and_store() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let a = engine.add_note(input("first note for deletion test")).unwrap().note;
        let b = engine
            .add_note(input("first note for deletion test, a close twin"))
            .unwrap()
            .note;

        engine.delete_note(a.id).unwrap();
        assert!(engine.store.get_note(a.id).is_err());
        assert!(engine.graph.neighbors(b.id).iter().all(|n| n.neighbor_id != a.id));
    }

    #[test]
    fn set_importance_is_idempotent() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let note = engine.add_note(input("a note to mark critical")).unwrap().note;
        let once = engine.set_importance(note.id, Importance::Critical).unwrap();
        let twice = engine.set_importance(note.id, Importance::Critical).unwrap();
        assert_eq!(once.importance, twice.importance);
    }

    #[test]
    fn update_note_reembeds_and_relinks() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let note = engine.add_note(input("original content about rust")).unwrap().note;
        let updated = engine
            .update_note(note.id, Some("completely different content about baking"), None)
            .unwrap();
        assert_eq!(updated.content, "completely different content about baking");
    }

    #[test]
    fn update_note_rejects_empty_content() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let note = engine.add_note(input("keep this content")).unwrap().note;
        let err = engine.update_note(note.id, Some("   "), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[test]
    fn stats_reports_note_and_edge_counts() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        engine.add_note(input("first note")).unwrap();
        engine.add_note(input("second note entirely unrelated topic")).unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.note_count, 2);
    }
}
