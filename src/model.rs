//! Core data model: notes, entities, edges, and their wire-facing input types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Importance tier, used as a multiplicative weight during activation scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Anchor notes: identity, key decisions. 2.0x activation multiplier.
    Critical,
    /// Default tier. 1.0x activation multiplier.
    #[default]
    Normal,
    /// Temporary or noisy notes. 0.5x activation multiplier.
    Low,
}

impl Importance {
    /// Base activation multiplier for this tier, before the access-count boost.
    pub fn base_factor(self) -> f32 {
        match self {
            Importance::Critical => 2.0,
            Importance::Normal => 1.0,
            Importance::Low => 0.5,
        }
    }
}

/// A stored memory note.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Stable integer id assigned by the store.
    pub id: i64,
    /// Raw content as submitted (without emotional-context augmentation).
    pub content: String,
    /// Free-form category, e.g. "general", "technical", "breakthrough".
    pub category: String,
    /// Importance tier used for activation weighting.
    pub importance: Importance,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time this note was returned by a search or otherwise "touched".
    pub last_accessed: DateTime<Utc>,
    /// Number of times this note has been touched.
    pub access_count: u32,
    /// Optional emotional tone label, e.g. "excited", "frustrated".
    pub emotional_tone: Option<String>,
    /// Emotional intensity on a 1-10 scale; defaults to 5 when a tone or
    /// reflection is present but no intensity was given.
    pub emotional_intensity: Option<u8>,
    /// Free-text emotional reflection accompanying the note.
    pub emotional_reflection: Option<String>,
}

/// Input for [`crate::MemoryEngine::add_note`].
///
/// `deny_unknown_fields` rejects unexpected keys rather than silently
/// dropping them, the way malformed API payloads are rejected elsewhere in
/// this stack.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteInput {
    /// Note content. Must be non-empty.
    pub content: String,
    /// Category; defaults to `"general"` when omitted.
    #[serde(default)]
    pub category: Option<String>,
    /// Importance tier; defaults to [`Importance::Normal`].
    #[serde(default)]
    pub importance: Importance,
    /// Skip the duplicate check and force creation.
    #[serde(default)]
    pub force: bool,
    /// Optional emotional tone, folded into the embedded text.
    #[serde(default)]
    pub emotional_tone: Option<String>,
    /// Emotional intensity (1-10); defaults to 5 when tone/reflection given.
    #[serde(default)]
    pub emotional_intensity: Option<u8>,
    /// Optional emotional reflection, folded into the embedded text.
    #[serde(default)]
    pub emotional_reflection: Option<String>,
}

/// Closed taxonomy of entity kinds the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Product,
    Event,
    Tech,
    Concept,
    Temporal,
    Financial,
    Measurement,
    /// Fallback bucket for anything recognized but not cleanly classified.
    Other,
}

/// A deduplicated named entity shared across notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Stable integer id assigned by the store.
    pub id: i64,
    /// Entity name, case-preserved for display.
    pub name: String,
    /// Lowercased, whitespace-collapsed form used for dedup lookups.
    pub normalized_name: String,
    /// Closed-taxonomy type.
    pub entity_type: EntityType,
}

/// Kind of relation an [`Edge`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    /// Two notes mention the same entity.
    Entity,
    /// Two notes were found semantically similar at ingestion time.
    Semantic,
}

/// A directed graph edge between two notes. Every edge is stored alongside
/// its mirror `(target, source)` with the same weight and type, modeling an
/// undirected relation as a symmetric pair of directed rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_id: i64,
    pub target_id: i64,
    pub weight: f32,
    pub edge_type: EdgeType,
}

/// A note's neighbor in the graph cache, the denormalized form of one side
/// of an [`Edge`] kept for O(1) traversal during activation spreading.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub neighbor_id: i64,
    pub weight: f32,
    pub edge_type: EdgeType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_factors_match_reference_algorithm() {
        assert_eq!(Importance::Critical.base_factor(), 2.0);
        assert_eq!(Importance::Normal.base_factor(), 1.0);
        assert_eq!(Importance::Low.base_factor(), 0.5);
    }

    #[test]
    fn note_input_rejects_unknown_fields() {
        let raw = r#"{"content": "hello", "bogus": true}"#;
        let result: Result<NoteInput, _> = serde_json::from_str(raw);
        assert!(result.is_err());
    }

    #[test]
    fn note_input_defaults_importance_to_normal() {
        let raw = r#"{"content": "hello"}"#;
        let input: NoteInput = serde_json::from_str(raw).unwrap();
        assert_eq!(input.importance, Importance::Normal);
    }
}
