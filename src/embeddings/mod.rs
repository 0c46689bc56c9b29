//! Embedding providers.
//!
//! `EmbeddingProvider` is the seam between the engine and whatever turns
//! text into vectors. [`DeterministicEmbeddingProvider`] needs no model
//! download and is what the engine uses by default and in tests; the
//! `embeddings` feature adds [`FastEmbedProvider`], a local ONNX embedder for
//! production use.

mod deterministic;
#[cfg(feature = "embeddings")]
mod fastembed_provider;

pub use deterministic::DeterministicEmbeddingProvider;
#[cfg(feature = "embeddings")]
pub use fastembed_provider::FastEmbedProvider;

/// Embedding error types.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model.
    #[error("model initialization failed: {0}")]
    ModelInit(String),
    /// Failed to generate an embedding.
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),
    /// Invalid input (empty, etc).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// A seam for turning text into a fixed-width vector. Pure and synchronous:
/// implementations own their own model state and are expected to be cheap to
/// call repeatedly.
pub trait EmbeddingProvider: Send + Sync {
    /// Width of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed a single piece of text. Implementations must return a vector of
    /// exactly [`EmbeddingProvider::dimensions`] length.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Compute cosine similarity between two vectors of equal length.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = (norm_a * norm_b).sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        0.0
    }
}

/// L2-normalize a vector in place.
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector {
            *x /= norm;
        }
    }
}

/// Truncate a vector to `dims` and re-normalize, the Matryoshka
/// Representation Learning trick: the first N dimensions of an MRL-trained
/// embedding ARE a valid N-dimensional embedding.
#[inline]
pub fn matryoshka_truncate(mut vector: Vec<f32>, dims: usize) -> Vec<f32> {
    if vector.len() > dims {
        vector.truncate(dims);
    }
    l2_normalize(&mut vector);
    vector
}

/// Serialize an embedding to little-endian float32 bytes for storage.
pub fn to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize little-endian float32 bytes back into an embedding.
pub fn from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn cosine_similarity_opposite_vectors_is_negative_one() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn bytes_roundtrip() {
        let v = vec![1.5_f32, -2.5, 3.0];
        let bytes = to_bytes(&v);
        let back = from_bytes(&bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn matryoshka_truncate_renormalizes() {
        let v = vec![1.0_f32; 8];
        let truncated = matryoshka_truncate(v, 4);
        assert_eq!(truncated.len(), 4);
        let norm: f32 = truncated.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.0001);
    }
}
