//! Embedding generation for semantic search and retrieval.
//!
//! The embedder is an owned, injectable component rather than ambient
//! global state, so tests can substitute a deterministic stub. The model
//! identity and dimensionality are fixed process-wide: mixing embeddings
//! from different models in one index is an invariant violation.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Create the configured embedder.
pub fn create_embedder(settings: &Settings) -> Arc<dyn Embedder> {
    Arc::new(
        OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        )
        .with_timeout(std::time::Duration::from_secs(
            settings.general.request_timeout_secs,
        )),
    )
}

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// Must produce the same vector as `embed_batch` would for that text:
    /// batch-size independence is a correctness invariant, not an
    /// optimization.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, one vector per input text,
    /// order-preserving.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Identity of the underlying model, persisted with every index entry
    /// so retrieval can detect cross-model contamination.
    fn model_id(&self) -> &str;
}

/// Deterministic embedder for tests.
///
/// Projects each text onto a small fixed basis using word hashes, so that
/// identical texts always produce identical vectors and texts sharing words
/// score higher than unrelated ones.
#[cfg(test)]
pub(crate) struct StubEmbedder {
    dimensions: usize,
}

#[cfg(test)]
impl StubEmbedder {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let slot = (hasher.finish() as usize) % self.dimensions;
            vector[slot] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[cfg(test)]
#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "stub"
    }
}

/// Embedder whose calls always fail, for exercising failure paths in tests.
#[cfg(test)]
pub(crate) struct FailingEmbedder;

#[cfg(test)]
#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(crate::error::FinbotError::Embedding(
            "backend unavailable".to_string(),
        ))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(crate::error::FinbotError::Embedding(
            "backend unavailable".to_string(),
        ))
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn model_id(&self) -> &str {
        "failing-stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_batch_matches_single() {
        let embedder = StubEmbedder::new(16);
        let texts = vec![
            "TFSA contribution limit".to_string(),
            "RRSP deduction deadline".to_string(),
            "GST credit payment dates".to_string(),
        ];

        let batch = embedder.embed_batch(&texts).await.unwrap();
        for (text, batch_vector) in texts.iter().zip(&batch) {
            let single = embedder.embed(text).await.unwrap();
            for (a, b) in single.iter().zip(batch_vector) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[tokio::test]
    async fn test_stub_is_deterministic_and_normalized() {
        let embedder = StubEmbedder::new(16);
        let a = embedder.embed("tax free savings account").await.unwrap();
        let b = embedder.embed("tax free savings account").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
