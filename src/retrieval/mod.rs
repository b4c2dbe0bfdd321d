//! Semantic retrieval over the vector index.
//!
//! Embeds the query with the same model that built the index, scores every
//! stored chunk by cosine similarity, and returns the top-k above the
//! configured floor. Ties are broken by insertion order, so identical
//! queries against an identical index always rank identically.

use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{FinbotError, Result};
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A retrieved chunk with its similarity score and provenance.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Chunk text.
    pub content: String,
    /// Cosine similarity to the query.
    pub score: f32,
    /// Source document the chunk came from.
    pub source_id: String,
    /// Position of the chunk within its document.
    pub chunk_index: i64,
}

/// Result of a retrieval pass.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    /// Chunks in descending score order. Empty when nothing in the index
    /// clears the score floor.
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Whether the pass found any relevant context.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Retrieves the most relevant indexed chunks for a query.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    min_score: f32,
}

impl Retriever {
    /// Create a retriever from settings and shared components.
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            store,
            embedder,
            top_k: settings.retrieval.top_k,
            min_score: settings.retrieval.min_score,
        }
    }

    /// Retrieve the top-k chunks for a query.
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.retrieve_with(query, self.top_k, self.min_score).await
    }

    /// Retrieve with explicit limit and score floor.
    pub async fn retrieve_with(
        &self,
        query: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<RetrievalResult> {
        self.check_index_model().await?;

        let query_embedding = self.embedder.embed(query).await?;
        let results = self
            .store
            .search_with_threshold(&query_embedding, limit, min_score)
            .await?;

        debug!("Retrieved {} chunks for query", results.len());

        Ok(RetrievalResult {
            chunks: results
                .into_iter()
                .map(|r| ScoredChunk {
                    content: r.entry.content,
                    score: r.score,
                    source_id: r.entry.source_id,
                    chunk_index: r.entry.chunk_index,
                })
                .collect(),
        })
    }

    /// Reject queries against an index built by a different embedding model.
    ///
    /// Comparing vectors from different models produces rankings that look
    /// plausible but mean nothing, so this fails loudly instead.
    async fn check_index_model(&self) -> Result<()> {
        if let Some((stored_model, stored_dims)) = self.store.stored_model().await? {
            if stored_model != self.embedder.model_id()
                || stored_dims != self.embedder.dimensions()
            {
                return Err(FinbotError::Config(format!(
                    "index was built with model '{}' ({} dims) but queries use '{}' ({} dims); re-ingest the corpus",
                    stored_model,
                    stored_dims,
                    self.embedder.model_id(),
                    self.embedder.dimensions()
                )));
            }
        }
        Ok(())
    }
}
