//! Engine configuration.
//!
//! Every tunable can be supplied programmatically via [`EngineConfig`] or
//! picked up from the environment via [`EngineConfig::from_env`], mirroring
//! the `os.getenv(...)`-driven configuration of the system this crate is
//! modeled on.

use std::env;

/// Which entity extraction backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityExtractorKind {
    /// Dictionary + regex extractor. Always available, deterministic.
    #[default]
    Regex,
    /// A caller-supplied statistical/NER backend (see
    /// [`crate::entities::EntityExtractor`]); the engine ships no model for
    /// this, the caller must provide one via `MemoryEngine::with_providers`.
    Statistical,
}

/// Which ANN index backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnIndexKind {
    /// HNSW via `usearch` (requires the `vector-search` feature).
    #[default]
    Hnsw,
    /// No ANN index; all nearest-neighbor queries fall back to a linear scan.
    Disabled,
}

/// All tunables for a [`crate::MemoryEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Embedding vector width. Every stored embedding must have exactly this
    /// many dimensions.
    pub embedding_dimensions: usize,
    /// Spreading-activation iterations.
    pub activation_iterations: u32,
    /// Per-hop activation decay factor, in `(0, 1]`.
    pub activation_decay: f32,
    /// Activation values below this are dropped before spreading further.
    pub activation_floor: f32,
    /// Minimum similarity for a note to seed the activation search.
    pub seed_min_similarity: f32,
    /// Minimum cosine similarity for two notes to receive a semantic edge.
    pub similarity_threshold: f32,
    /// Half-life, in days, of the recency factor.
    pub half_life_days: f32,
    /// Maximum number of semantic edges created per ingested note.
    pub max_semantic_links: usize,
    /// Cosine similarity at/above which a new note is rejected as a
    /// duplicate (unless ingestion is forced).
    pub duplicate_threshold: f32,
    /// Cosine similarity at/above which a new note triggers a "similar note
    /// exists" warning without blocking ingestion.
    pub similar_threshold: f32,
    /// Whether to maintain and query the ANN index.
    pub ann_index: AnnIndexKind,
    /// Which entity extractor to use by default.
    pub entity_extractor: EntityExtractorKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_dimensions: 384,
            activation_iterations: 3,
            activation_decay: 0.7,
            activation_floor: 0.01,
            seed_min_similarity: 0.3,
            similarity_threshold: 0.5,
            half_life_days: 30.0,
            max_semantic_links: 5,
            duplicate_threshold: 0.95,
            similar_threshold: 0.90,
            ann_index: AnnIndexKind::Hnsw,
            entity_extractor: EntityExtractorKind::Regex,
        }
    }
}

impl EngineConfig {
    /// Build a config from environment variables, falling back to
    /// [`EngineConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            embedding_dimensions: env_parse("EMBEDDING_DIMENSIONS", default.embedding_dimensions),
            activation_iterations: env_parse(
                "ACTIVATION_ITERATIONS",
                default.activation_iterations,
            ),
            activation_decay: env_parse("ACTIVATION_DECAY", default.activation_decay),
            activation_floor: env_parse("ACTIVATION_FLOOR", default.activation_floor),
            seed_min_similarity: env_parse("SEED_MIN_SIMILARITY", default.seed_min_similarity),
            similarity_threshold: env_parse("SIMILARITY_THRESHOLD", default.similarity_threshold),
            half_life_days: env_parse("HALF_LIFE_DAYS", default.half_life_days),
            max_semantic_links: env_parse("MAX_SEMANTIC_LINKS", default.max_semantic_links),
            duplicate_threshold: env_parse("DUPLICATE_THRESHOLD", default.duplicate_threshold),
            similar_threshold: env_parse("SIMILAR_THRESHOLD", default.similar_threshold),
            ann_index: match env::var("USE_ANN_INDEX").as_deref() {
                Ok("false") | Ok("0") => AnnIndexKind::Disabled,
                _ => default.ann_index,
            },
            entity_extractor: match env::var("ENTITY_EXTRACTOR").as_deref() {
                Ok("statistical") => EntityExtractorKind::Statistical,
                _ => default.entity_extractor,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
