//! Error taxonomy for the memory engine.
//!
//! Every public operation returns [`EngineError`]. Lower-level errors from
//! storage, embeddings, and the ANN index convert into it via `#[from]`, but
//! callers only need to match on the taxonomy spec.md defines: a caller-fixable
//! problem (`InvalidArgument`), a missing id (`NotFound`), a dedup hit
//! (`DuplicateDetected`), a model that isn't ready (`EmbeddingUnavailable`), a
//! persistence failure (`StoreFailure`), or something retryable (`Transient`).

use crate::embeddings::EmbeddingError;
use crate::index::IndexError;
use crate::storage::StorageError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error taxonomy.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Caller supplied a malformed or out-of-range argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No note, entity, or edge exists for the given id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A near-duplicate of the submitted content already exists.
    #[error("duplicate of note {existing_id} ({similarity:.2} similarity)")]
    DuplicateDetected {
        /// Id of the existing note the submission collided with.
        existing_id: i64,
        /// Preview of the existing note's content.
        existing_content: String,
        /// Cosine similarity that triggered the dedup block.
        similarity: f32,
    },

    /// The embedding backend could not produce a vector.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The persistent store failed in a way that isn't retryable.
    #[error("store failure: {0}")]
    StoreFailure(String),

    /// A lock was poisoned or a resource was momentarily unavailable;
    /// callers may retry.
    #[error("transient error: {0}")]
    Transient(String),
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => EngineError::NotFound(id),
            StorageError::LockPoisoned(msg) => EngineError::Transient(msg),
            other => EngineError::StoreFailure(other.to_string()),
        }
    }
}

impl From<EmbeddingError> for EngineError {
    fn from(e: EmbeddingError) -> Self {
        EngineError::EmbeddingUnavailable(e.to_string())
    }
}

impl From<IndexError> for EngineError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::InvalidDimensions(expected, got) => EngineError::InvalidArgument(format!(
                "invalid dimensions: expected {expected}, got {got}"
            )),
            other => EngineError::Transient(other.to_string()),
        }
    }
}
