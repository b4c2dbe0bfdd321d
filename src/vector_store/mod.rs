//! Vector store abstraction for FinBot.
//!
//! Provides a trait-based interface for different vector index backends.
//! Entries are written only by the ingestion pipeline and replaced as a
//! whole per source, so readers always see a complete entry set for a
//! document.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Open the configured vector store.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    Ok(match settings.vector_store.provider.as_str() {
        "memory" => Arc::new(MemoryVectorStore::new()),
        _ => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
    })
}

/// A persisted chunk with its embedding and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique entry ID.
    pub id: Uuid,
    /// Source document identity (path or URI).
    pub source_id: String,
    /// Content hash of the source document this entry was chunked from.
    pub content_hash: String,
    /// Position of the chunk in the document's chunk sequence.
    pub chunk_index: i64,
    /// Start character offset of the chunk in the document text.
    pub start_offset: i64,
    /// End character offset of the chunk in the document text.
    pub end_offset: i64,
    /// Chunk text.
    pub content: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Identity of the embedding model that produced the vector.
    pub embedding_model: String,
    /// When this entry was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexEntry {
    /// Create a new index entry.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: String,
        content_hash: String,
        chunk_index: i64,
        start_offset: i64,
        end_offset: i64,
        content: String,
        embedding: Vec<f32>,
        embedding_model: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id,
            content_hash,
            chunk_index,
            start_offset,
            end_offset,
            content,
            embedding,
            embedding_model,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched entry.
    pub entry: IndexEntry,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Summary information about an indexed source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedSource {
    /// Source document identity.
    pub source_id: String,
    /// Content hash the entries were built from.
    pub content_hash: String,
    /// Number of indexed chunks.
    pub chunk_count: u32,
    /// When the source was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Replace all entries for a source with a new set, atomically.
    ///
    /// A concurrent reader sees either the old complete entry set or the
    /// new one, never an interleaving. Returns the number of entries
    /// written.
    async fn replace_source(&self, source_id: &str, entries: &[IndexEntry]) -> Result<usize>;

    /// Search for the most similar entries.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Search with a minimum similarity threshold.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete entries by source identity. Returns the number deleted.
    async fn delete_by_source(&self, source_id: &str) -> Result<usize>;

    /// List all indexed sources.
    async fn list_sources(&self) -> Result<Vec<IndexedSource>>;

    /// Get a specific source's summary, if indexed.
    async fn get_source(&self, source_id: &str) -> Result<Option<IndexedSource>>;

    /// Get the stored content hash for a source, if indexed.
    async fn source_hash(&self, source_id: &str) -> Result<Option<String>>;

    /// Get all entries for a source, in chunk order.
    async fn get_by_source(&self, source_id: &str) -> Result<Vec<IndexEntry>>;

    /// Get total entry count.
    async fn entry_count(&self) -> Result<usize>;

    /// Model identity and dimensionality of the stored embeddings, if any.
    ///
    /// Used by the retriever to reject queries embedded with a different
    /// model before they produce meaningless rankings.
    async fn stored_model(&self) -> Result<Option<(String, usize)>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
