//! Ingestion pipeline (C6): duplicate check, entity linking, and semantic
//! linking for a newly submitted note.
//!
//! Grounded step-for-step on the reference `add_note_with_links`: embed
//! (with emotional context folded into the embedded text, not the stored
//! content) → duplicate check → insert → entity links → semantic links.

use crate::engine::MemoryEngine;
use crate::entities::ExtractedEntity;
use crate::error::{EngineError, Result};
use crate::model::{EdgeType, Note, NoteInput};

/// Result of a successful [`MemoryEngine::add_note`] call.
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// The newly created note.
    pub note: Note,
    /// Entities extracted from the note's content.
    pub entities: Vec<ExtractedEntity>,
    /// Number of distinct other notes linked via shared entities.
    pub entity_links: usize,
    /// Number of notes linked via semantic similarity.
    pub semantic_links: usize,
    /// Notes similar enough to warrant a warning, without blocking
    /// ingestion (similarity in `[similar_threshold, duplicate_threshold)`).
    pub similar_warnings: Vec<(i64, f32)>,
}

/// Build the text that actually gets embedded: emotional tone and
/// reflection are folded in as trailing sentences, but never stored as the
/// note's `content`. Reproduced bit-for-bit from the reference
/// implementation's `full_text` composition so dedup hashing stays
/// reproducible: `{content}\n\n{sentences joined by ". "}`.
fn compose_embedding_text(content: &str, tone: Option<&str>, reflection: Option<&str>) -> String {
    if tone.is_none() && reflection.is_none() {
        return content.to_string();
    }
    let mut parts = Vec::new();
    if let Some(tone) = tone {
        parts.push(format!("Emotional tone: {tone}"));
    }
    if let Some(reflection) = reflection {
        parts.push(reflection.to_string());
    }
    format!("{content}\n\n{}", parts.join(". "))
}

impl MemoryEngine {
    /// Add a note, automatically extracting entities, linking it to notes
    /// sharing those entities, and linking it to semantically similar
    /// notes.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidArgument`] for empty content, and
    /// [`EngineError::DuplicateDetected`] when an existing note is at or
    /// above `duplicate_threshold` similarity and `input.force` is `false`.
    pub fn add_note(&self, input: NoteInput) -> Result<IngestResult> {
        if input.content.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "content must not be empty".to_string(),
            ));
        }

        let category = input.category.unwrap_or_else(|| "general".to_string());
        let emotional_intensity = input
            .emotional_intensity
            .or(if input.emotional_tone.is_some() || input.emotional_reflection.is_some() {
                Some(5)
            } else {
                None
            });

        let embedding_text = compose_embedding_text(
            &input.content,
            input.emotional_tone.as_deref(),
            input.emotional_reflection.as_deref(),
        );
        let embedding = self.embedding_provider.embed(&embedding_text)?;

        if !input.force {
            if let Some((existing_id, similarity)) =
                self.find_duplicate(&embedding, self.config.duplicate_threshold)?
            {
                let existing = self.store.get_note(existing_id)?;
                return Err(EngineError::DuplicateDetected {
                    existing_id,
                    existing_content: preview(&existing.content),
                    similarity,
                });
            }
        }

        let note = self.store.create_note(
            &input.content,
            &category,
            input.importance,
            input.emotional_tone.as_deref(),
            emotional_intensity,
            input.emotional_reflection.as_deref(),
            &embedding,
        )?;

        {
            let mut index = self.lock_index()?;
            index.add(note.id, &embedding)?;
        }

        let entities = self.entity_extractor.extract(&input.content);
        let mut entity_links = std::collections::HashSet::new();
        for entity in &entities {
            let stored = self
                .store
                .get_or_create_entity(&entity.name, entity.entity_type)?;
            self.store.link_note_to_entity(note.id, stored.id)?;

            for related in self.store.get_notes_by_entity(stored.id)? {
                if related.id == note.id {
                    continue;
                }
                self.link_pair(note.id, related.id, 0.6, EdgeType::Entity)?;
                entity_links.insert(related.id);
            }
        }

        let candidates = {
            let index = self.lock_index()?;
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

        let mut semantic_links = 0;
        let mut similar_warnings = Vec::new();
        for (candidate_id, similarity) in candidates
            .into_iter()
            .filter(|(id, _)| *id != note.id)
            .take(self.config.max_semantic_links)
        {
            self.link_pair(note.id, candidate_id, similarity, EdgeType::Semantic)?;
            semantic_links += 1;
            if similarity >= self.config.similar_threshold {
                similar_warnings.push((candidate_id, similarity));
            }
        }

        Ok(IngestResult {
            note,
            entities,
            entity_links: entity_links.len(),
            semantic_links,
            similar_warnings,
        })
    }

    fn lock_index(&self) -> Result<std::sync::MutexGuard<'_, crate::index::AnnIndex>> {
        self.index
            .lock()
            .map_err(|_| EngineError::Transient("index lock poisoned".to_string()))
    }

    /// Insert both directions of a symmetric edge and mirror them into the
    /// graph cache.
    pub(crate) fn link_pair(&self, a: i64, b: i64, weight: f32, edge_type: EdgeType) -> Result<()> {
        self.store.create_edge(a, b, weight, edge_type)?;
        self.store.create_edge(b, a, weight, edge_type)?;
        self.graph.add_edge(&crate::model::Edge {
            source_id: a,
            target_id: b,
            weight,
            edge_type,
        });
        self.graph.add_edge(&crate::model::Edge {
            source_id: b,
            target_id: a,
            weight,
            edge_type,
        });
        Ok(())
    }

    /// Find the single best match at or above `threshold`, preferring the
    /// ANN index and falling back to a linear scan, used for the duplicate
    /// check.
    fn find_duplicate(&self, embedding: &[f32], threshold: f32) -> Result<Option<(i64, f32)>> {
        let index = self.lock_index()?;
        if index.enabled() {
            let hits = index.search(embedding, 5, threshold)?;
            return Ok(hits.into_iter().next());
        }
        drop(index);
        let hits = self.linear_scan_similar(embedding, threshold)?;
        Ok(hits.into_iter().next())
    }

    /// O(n) cosine-similarity scan over every stored embedding, used when
    /// the ANN index is disabled.
    pub(crate) fn linear_scan_similar(&self, embedding: &[f32], threshold: f32) -> Result<Vec<(i64, f32)>> {
        let mut hits: Vec<(i64, f32)> = self
            .store
            .get_all_embeddings()?
            .into_iter()
            .map(|(id, vector)| (id, crate::embeddings::cosine_similarity(embedding, &vector)))
            .filter(|(_, sim)| *sim >= threshold)
            .collect();
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(hits)
    }
}

fn preview(content: &str) -> String {
    content.chars().take(200).collect()
}
