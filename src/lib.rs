//! # HippoGraph
//!
//! A personal knowledge-graph memory engine. Notes are embedded, linked by
//! semantic similarity and shared entities, and retrieved through a
//! vector-seeded spreading-activation walk weighted by recency, importance,
//! and access frequency.
//!
//! This crate is the retrieval and graph engine: the ANN index, the
//! in-memory graph adjacency cache, the ingestion pipeline that maintains
//! both, the spreading-activation ranking, and the deduplication policy that
//! keeps the note set clean. The persistent note store lives alongside it
//! (SQLite, behind [`Storage`]); the embedding model, request/transport
//! layer, authentication, CLI, and dataset adapters are treated as external
//! collaborators this crate doesn't implement.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hippograph::{MemoryEngine, NoteInput};
//!
//! let engine = MemoryEngine::new(None)?;
//!
//! let result = engine.add_note(NoteInput {
//!     content: "HippoGraph links notes by meaning and shared entities".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let hits = engine.search("knowledge graph retrieval", 5, &Default::default())?;
//! # Ok::<(), hippograph::EngineError>(())
//! ```
//!
//! ## Feature flags
//!
//! - `embeddings`: local ONNX inference via `fastembed` ([`embeddings::FastEmbedProvider`]).
//! - `vector-search` (default): HNSW ANN search via `usearch`. Disabling it
//!   falls every nearest-neighbor query back to a linear scan.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod activation;
pub mod config;
pub mod embeddings;
pub mod entities;
pub mod error;
pub mod graph;
pub mod index;
pub mod ingest;
pub mod model;
pub mod ops;
pub mod storage;

mod engine;

pub use activation::{ActivatedNote, SearchFilters};
pub use config::{AnnIndexKind, EngineConfig, EntityExtractorKind};
pub use embeddings::{cosine_similarity, l2_normalize, DeterministicEmbeddingProvider, EmbeddingError, EmbeddingProvider};
#[cfg(feature = "embeddings")]
#[cfg_attr(docsrs, doc(cfg(feature = "embeddings")))]
pub use embeddings::FastEmbedProvider;
pub use engine::MemoryEngine;
pub use entities::{EntityExtractor, ExtractedEntity, RegexEntityExtractor};
pub use error::{EngineError, Result};
pub use graph::GraphCache;
pub use index::{AnnIndex, IndexError, IndexStats};
pub use ingest::IngestResult;
pub use model::{Edge, EdgeType, Entity, EntityType, Importance, Neighbor, Note, NoteInput};
pub use ops::{EngineStats, NoteGraph, SimilarNote};
pub use storage::{Storage, StorageError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types for `use hippograph::prelude::*;`.
pub mod prelude {
    pub use crate::{
        ActivatedNote, EngineConfig, EngineError, EngineStats, EntityType, Importance,
        MemoryEngine, Note, NoteGraph, NoteInput, Result, SearchFilters, SimilarNote,
    };
}
