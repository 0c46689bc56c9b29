//! Top-level wiring: the persistent store, the ANN index, and the graph
//! cache behind one `MemoryEngine`.
//!
//! Lock acquisition order, when more than one lock is needed, is always
//! store → index → graph, and no lock is ever held across a call into the
//! embedding provider (model inference can block on I/O or the GPU/CPU
//! queue far longer than any of these locks should be held).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::EngineConfig;
use crate::embeddings::{DeterministicEmbeddingProvider, EmbeddingProvider};
use crate::entities::{EntityExtractor, RegexEntityExtractor};
use crate::error::Result;
use crate::graph::GraphCache;
use crate::index::AnnIndex;
use crate::storage::Storage;

/// The memory engine: ingestion, activation search, and the related
/// operations (find_similar, get_graph, update_note, delete_note,
/// set_importance) all hang off this type.
pub struct MemoryEngine {
    pub(crate) store: Storage,
    pub(crate) index: Mutex<AnnIndex>,
    pub(crate) graph: GraphCache,
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) entity_extractor: Arc<dyn EntityExtractor>,
    pub(crate) config: EngineConfig,
}

impl MemoryEngine {
    /// Open (or create) a store at `db_path`, with the deterministic
    /// embedding provider and the regex entity extractor, using
    /// [`EngineConfig::default`].
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_config(db_path, EngineConfig::default())
    }

    /// Open a store with an explicit config.
    pub fn with_config(db_path: Option<PathBuf>, config: EngineConfig) -> Result<Self> {
        let provider = Arc::new(DeterministicEmbeddingProvider::new(config.embedding_dimensions));
        Self::build(db_path, config, provider, Arc::new(RegexEntityExtractor))
    }

    /// Open a store with an explicit embedding provider and entity
    /// extractor — the hook a caller uses to supply a statistical/NER
    /// backend (see [`crate::config::EntityExtractorKind::Statistical`]) or
    /// the `embeddings`-feature-gated [`crate::embeddings::FastEmbedProvider`].
    pub fn with_providers(
        db_path: Option<PathBuf>,
        config: EngineConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        entity_extractor: Arc<dyn EntityExtractor>,
    ) -> Result<Self> {
        Self::build(db_path, config, embedding_provider, entity_extractor)
    }

    /// Open an in-memory store for tests.
    pub fn in_memory_for_tests() -> Result<Self> {
        let config = EngineConfig::default();
        let provider = Arc::new(DeterministicEmbeddingProvider::new(config.embedding_dimensions));
        let store = Storage::open_in_memory()?;
        Self::bootstrap(store, config, provider, Arc::new(RegexEntityExtractor))
    }

    fn build(
        db_path: Option<PathBuf>,
        config: EngineConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        entity_extractor: Arc<dyn EntityExtractor>,
    ) -> Result<Self> {
        let store = Storage::new(db_path)?;
        Self::bootstrap(store, config, embedding_provider, entity_extractor)
    }

    /// C8 bootstrap: load every note's embedding into a fresh ANN index and
    /// every edge into a fresh graph cache.
    fn bootstrap(
        store: Storage,
        config: EngineConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        entity_extractor: Arc<dyn EntityExtractor>,
    ) -> Result<Self> {
        let mut index = AnnIndex::new(config.embedding_dimensions, config.ann_index)?;
        let vectors = store.get_all_embeddings()?;
        let indexed = index.build(&vectors)?;

        let graph = GraphCache::new();
        let edges = store.get_all_edges()?;
        graph.rebuild(&edges);

        tracing::info!(
            vectors = vectors.len(),
            indexed,
            edges = edges.len(),
            "bootstrapped memory engine"
        );

        Ok(Self {
            store,
            index: Mutex::new(index),
            graph,
            embedding_provider,
            entity_extractor,
            config,
        })
    }

    /// Rebuild the ANN index and graph cache from the store, discarding
    /// whatever they currently hold. Useful after out-of-band writes to the
    /// database file.
    pub fn rebuild(&self) -> Result<()> {
        let vectors = self.store.get_all_embeddings()?;
        let mut index = self
            .index
            .lock()
            .map_err(|_| crate::error::EngineError::Transient("index lock poisoned".to_string()))?;
        let indexed = index.build(&vectors)?;
        drop(index);

        let edges = self.store.get_all_edges()?;
        self.graph.rebuild(&edges);

        tracing::info!(
            vectors = vectors.len(),
            indexed,
            edges = edges.len(),
            "rebuilt memory engine"
        );
        Ok(())
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstraps_empty_store_without_error() {
        let engine = MemoryEngine::in_memory_for_tests().unwrap();
        assert_eq!(engine.store.get_all_notes().unwrap().len(), 0);
    }
}
