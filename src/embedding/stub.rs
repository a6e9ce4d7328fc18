use tracing::debug;

use super::{Embedder, EmbeddingError};

/// Model id reported by [`StubEmbedder`]; part of the embedding cache entry.
pub const STUB_MODEL_ID: &str = "stub-blake3";

/// Deterministic embedder for tests and offline runs.
///
/// The text's BLAKE3 digest seeds a linear congruential generator; the output is L2-normalized,
/// so identical text always yields the identical unit vector.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Synchronous form of [`Embedder::embed`].
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        debug!(text_len = text.len(), "Generating stub embedding");

        let digest = blake3::hash(text.as_bytes());
        let mut state = crate::hashing::hash_to_u64(digest.as_bytes());

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            embedding.push(value);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        STUB_MODEL_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.embed_sync(text))
    }
}

/// Scales `vector` to unit length in place; the zero vector is left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
