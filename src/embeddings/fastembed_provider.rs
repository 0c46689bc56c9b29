//! Local ONNX embedding inference via `fastembed`, gated behind the
//! `embeddings` feature. Mirrors the teacher's model-caching and Matryoshka
//! truncation approach.

use std::sync::{Mutex, OnceLock};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{matryoshka_truncate, EmbeddingError, EmbeddingProvider};

/// Nomic Embed Text v1.5's native output width before Matryoshka truncation.
const NATIVE_DIMENSIONS: usize = 768;

/// Maximum text length handed to the model; longer input is truncated.
const MAX_TEXT_LENGTH: usize = 8192;

fn get_cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "hippograph", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    if let Some(base_dirs) = directories::BaseDirs::new() {
        return base_dirs.home_dir().join(".cache/hippograph/fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

/// A `fastembed`-backed provider. Truncates the model's native 768-dim
/// output to the configured width and re-normalizes (Matryoshka
/// Representation Learning: the first N dims of an MRL-trained embedding
/// are themselves a valid N-dim embedding).
pub struct FastEmbedProvider {
    dimensions: usize,
    model: OnceLock<Result<Mutex<TextEmbedding>, String>>,
}

impl FastEmbedProvider {
    /// Create a provider truncating to `dimensions`. The model itself is
    /// lazily initialized (and downloaded, if not cached) on first `embed`.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model: OnceLock::new(),
        }
    }

    fn model(&self) -> Result<std::sync::MutexGuard<'_, TextEmbedding>, EmbeddingError> {
        let result = self.model.get_or_init(|| {
            let cache_dir = get_cache_dir();
            if let Err(e) = std::fs::create_dir_all(&cache_dir) {
                tracing::warn!("failed to create embedding cache dir {:?}: {}", cache_dir, e);
            }

            let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
                .with_show_download_progress(true)
                .with_cache_dir(cache_dir);

            TextEmbedding::try_new(options)
                .map(Mutex::new)
                .map_err(|e| format!("failed to initialize nomic-embed-text-v1.5: {e}"))
        });

        match result {
            Ok(model) => model
                .lock()
                .map_err(|e| EmbeddingError::ModelInit(format!("lock poisoned: {e}"))),
            Err(err) => Err(EmbeddingError::ModelInit(err.clone())),
        }
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "text cannot be empty".to_string(),
            ));
        }

        let text = if text.len() > MAX_TEXT_LENGTH {
            &text[..MAX_TEXT_LENGTH]
        } else {
            text
        };

        let mut model = self.model()?;
        let embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        let raw = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("no embedding generated".to_string()))?;

        debug_assert_eq!(raw.len(), NATIVE_DIMENSIONS);
        Ok(matryoshka_truncate(raw, self.dimensions))
    }
}
