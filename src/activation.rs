//! Spreading-activation search (C7).
//!
//! Grounded on the reference `search_with_activation`: seed activation from
//! query similarity, spread through the graph with additive combine and
//! per-iteration max-normalization (the non-deprecated variant — see
//! `DESIGN.md` for why additive combine was chosen over a max-combine
//! spread), then weight by recency and importance before ranking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::model::{EntityType, Importance, Note};

/// One ranked result from [`MemoryEngine::search`].
#[derive(Debug, Clone)]
pub struct ActivatedNote {
    pub note: Note,
    /// Final activation score after recency/importance weighting, not
    /// bounded to `[0, 1]` (importance can boost it above the 0-1 range the
    /// raw spreading-activation values live in).
    pub activation: f32,
}

/// Optional result filters for [`MemoryEngine::search`], applied after
/// ranking (§4.5 step 4). Every bound is inclusive.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Exact category match.
    pub category: Option<String>,
    /// Lower bound (inclusive) on `created_at`.
    pub time_after: Option<DateTime<Utc>>,
    /// Upper bound (inclusive) on `created_at`.
    pub time_before: Option<DateTime<Utc>>,
    /// Require at least one incident entity of this type.
    pub entity_type: Option<EntityType>,
}

impl SearchFilters {
    /// A filter set that matches everything.
    pub fn none() -> Self {
        Self::default()
    }

    fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.time_after.is_none()
            && self.time_before.is_none()
            && self.entity_type.is_none()
    }
}

/// Recency weighting factor in `[min_factor, 1.0]`: 1.0 for a note accessed
/// today (or in the future, clamped to 0 age), 0.5 at `half_life_days`,
/// asymptoting toward `min_factor` (never fully vanishing, so old notes stay
/// reachable).
fn recency_factor(note: &Note, half_life_days: f32) -> f32 {
    const MIN_FACTOR: f32 = 0.1;
    const MAX_FACTOR: f32 = 1.0;
    let age_days = ((Utc::now() - note.last_accessed).num_seconds() as f32 / 86400.0).max(0.0);
    let decay = 0.5_f32.powf(age_days / half_life_days);
    decay.clamp(MIN_FACTOR, MAX_FACTOR)
}

/// Importance weighting factor: the tier's base multiplier plus a small
/// boost for frequently accessed notes, capped at +0.5.
fn importance_factor(importance: Importance, access_count: u32) -> f32 {
    let access_boost = (access_count as f32 * 0.025).min(0.5);
    importance.base_factor() + access_boost
}

impl MemoryEngine {
    /// Search for notes relevant to `query`, optionally restricted to
    /// `category_filter`. Implements the five-step algorithm: seed, spread,
    /// weight, rank, touch.
    pub fn search(&self, query: &str, limit: usize, filters: &SearchFilters) -> Result<Vec<ActivatedNote>> {
        self.search_with_params(
            query,
            limit,
            filters,
            self.config.activation_iterations,
            self.config.activation_decay,
        )
    }

    /// Same as [`MemoryEngine::search`] but with explicit iteration/decay
    /// overrides, exposed for testing convergence behavior (with
    /// `iterations = 0` the result is exactly the ANN seeds reweighted by
    /// recency/importance; with `decay = 0` the second iteration
    /// contributes nothing).
    pub fn search_with_params(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
        iterations: u32,
        decay: f32,
    ) -> Result<Vec<ActivatedNote>> {
        let query_embedding = self.embedding_provider.embed(query)?;

        // Step 1: seed activation from semantic similarity.
        let mut activations: HashMap<i64, f32> = {
            let index = self
                .index
                .lock()
                .map_err(|_| crate::error::EngineError::Transient("index lock poisoned".to_string()))?;
            if index.enabled() && !index.is_empty() {
                index
                    .search(&query_embedding, limit * 3, 0.0)?
                    .into_iter()
                    .collect()
            } else {
                drop(index);
                self.linear_scan_similar(&query_embedding, self.config.seed_min_similarity)?
                    .into_iter()
                    .collect()
            }
        };

        // Step 2: spread activation through the graph, iterations times,
        // additive combine (self-retention + neighbor spread both add into
        // the next round) followed by max-normalization.
        for _ in 0..iterations {
            let mut next: HashMap<i64, f32> = HashMap::new();
            for (&node_id, &activation) in activations.iter() {
                if activation < self.config.activation_floor {
                    continue;
                }
                *next.entry(node_id).or_insert(0.0) += activation * decay;

                for neighbor in self.graph.neighbors(node_id) {
                    let spread = activation * neighbor.weight * decay;
                    *next.entry(neighbor.neighbor_id).or_insert(0.0) += spread;
                }
            }

            if let Some(&max) = next.values().max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)) {
                if max > 0.0 {
                    for v in next.values_mut() {
                        *v /= max;
                    }
                }
            }
            activations = next;
        }

        // Step 3: apply recency and importance weighting.
        let mut notes: HashMap<i64, Note> = HashMap::new();
        for &id in activations.keys() {
            if let Ok(note) = self.store.get_note(id) {
                notes.insert(id, note);
            }
        }

        for (id, activation) in activations.iter_mut() {
            if let Some(note) = notes.get(id) {
                *activation *= recency_factor(note, self.config.half_life_days);
                *activation *= importance_factor(note.importance, note.access_count);
            }
        }

        // Step 4: sort, filter, touch, and truncate.
        let mut ranked: Vec<(i64, f32)> = activations.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut results = Vec::with_capacity(limit);
        for (id, activation) in ranked {
            let Some(note) = notes.remove(&id) else {
                continue;
            };
            if !self.passes_filters(&note, filters)? {
                continue;
            }

            let _ = self.store.touch_note(id);
            results.push(ActivatedNote { note, activation });

            if results.len() >= limit {
                break;
            }
        }

        Ok(results)
    }

    /// Evaluate the optional category/time/entity_type filters against a
    /// single candidate note (§4.5 step 4, both time bounds inclusive).
    fn passes_filters(&self, note: &Note, filters: &SearchFilters) -> Result<bool> {
        if filters.is_empty() {
            return Ok(true);
        }
        if let Some(category) = &filters.category {
            if &note.category != category {
                return Ok(false);
            }
        }
        if let Some(after) = filters.time_after {
            if note.created_at < after {
                return Ok(false);
            }
        }
        if let Some(before) = filters.time_before {
            if note.created_at > before {
                return Ok(false);
            }
        }
        if let Some(entity_type) = filters.entity_type {
            let types = self.store.get_entity_types_for_node(note.id)?;
            if !types.contains(&entity_type) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteInput;

    fn note_input(content: &str) -> NoteInput {
        NoteInput {
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn search_finds_seeded_note() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        engine.add_note(note_input("rust ownership and borrowing rules")).unwrap();
        engine.add_note(note_input("baking sourdough bread at home")).unwrap();

        let results = engine.search("rust borrowing semantics", 5, &SearchFilters::none()).unwrap();
        assert!(!results.is_empty());
        assert!(results[0].note.content.contains("rust"));
    }

    #[test]
    fn category_filter_excludes_other_categories() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let mut technical = note_input("rust memory graph activation spreading");
        technical.category = Some("technical".to_string());
        engine.add_note(technical).unwrap();

        let mut general = note_input("rust memory graph activation spreading but general");
        general.category = Some("general".to_string());
        engine.add_note(general).unwrap();

        let filters = SearchFilters {
            category: Some("technical".to_string()),
            ..Default::default()
        };
        let results = engine
            .search("rust memory graph activation", 10, &filters)
            .unwrap();
        assert!(results.iter().all(|r| r.note.category == "technical"));
    }

    #[test]
    fn entity_type_filter_excludes_notes_without_that_entity() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        engine.add_note(note_input("working with rust and tokio today")).unwrap();
        engine.add_note(note_input("a walk in the park this afternoon")).unwrap();

        let filters = SearchFilters {
            entity_type: Some(crate::model::EntityType::Tech),
            ..Default::default()
        };
        let results = engine.search("today", 10, &filters).unwrap();
        assert!(results.iter().all(|r| r.note.content.contains("rust")));
    }

    #[test]
    fn time_bounds_are_inclusive() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let created = engine.add_note(note_input("a bounded note about time filters")).unwrap().note;

        let filters = SearchFilters {
            time_after: Some(created.created_at),
            time_before: Some(created.created_at),
            ..Default::default()
        };
        let results = engine.search("bounded note time filters", 10, &filters).unwrap();
        assert!(results.iter().any(|r| r.note.id == created.id));
    }

    #[test]
    fn critical_importance_outranks_normal_at_equal_similarity() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let mut critical = note_input("shared identical vocabulary for ranking test alpha");
        critical.importance = Importance::Critical;
        let critical_note = engine.add_note(critical).unwrap().note;

        let mut normal = note_input("shared identical vocabulary for ranking test beta");
        normal.importance = Importance::Normal;
        engine.add_note(normal).unwrap();

        let results = engine
            .search("shared identical vocabulary for ranking test", 10, &SearchFilters::none())
            .unwrap();
        let critical_rank = results.iter().position(|r| r.note.id == critical_note.id);
        assert!(critical_rank.is_some());
    }

    #[test]
    fn search_touches_returned_notes() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        let created = engine.add_note(note_input("a note about touching access counts")).unwrap().note;
        assert_eq!(created.access_count, 0);

        engine.search("touching access counts", 5, &SearchFilters::none()).unwrap();
        let refetched = engine.store.get_note(created.id).unwrap();
        assert_eq!(refetched.access_count, 1);
    }
}
