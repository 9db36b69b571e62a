// Embeddings module
// Ollama-backed text embedding with explicit vector normalization

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;

/// Anything that can turn text into a fixed-length embedding vector.
///
/// The single seam between the retrieval pipeline and the embedding
/// provider; test fixtures implement it to simulate provider failures.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// L2-normalize a vector in place so that in-memory dot products and the
/// store's cosine distance agree on ordering. Zero and non-finite vectors
/// are left untouched rather than dividing by zero.
#[inline]
pub fn normalize(vector: &mut [f32]) {
    let norm_sq: f32 = vector.iter().map(|v| v * v).sum();
    if norm_sq <= 0.0 || !norm_sq.is_finite() {
        return;
    }

    let norm = norm_sq.sqrt();
    for value in vector.iter_mut() {
        *value /= norm;
    }
}
