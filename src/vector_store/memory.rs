//! In-memory vector store implementation.
//!
//! Useful for testing and small corpora. Entries are kept in insertion
//! order, which gives equal-score search results a stable tie-break.

use super::{cosine_similarity, IndexEntry, IndexedSource, SearchResult, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    entries: RwLock<Vec<IndexEntry>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn replace_source(&self, source_id: &str, entries: &[IndexEntry]) -> Result<usize> {
        let mut store = self.entries.write().unwrap();
        store.retain(|e| e.source_id != source_id);
        store.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::MIN).await
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let entries = self.entries.read().unwrap();

        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|entry| {
                let score = cosine_similarity(query_embedding, &entry.embedding);
                SearchResult {
                    entry: entry.clone(),
                    score,
                }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        // Stable sort: equal scores keep insertion order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(results)
    }

    async fn delete_by_source(&self, source_id: &str) -> Result<usize> {
        let mut entries = self.entries.write().unwrap();
        let initial_len = entries.len();
        entries.retain(|e| e.source_id != source_id);
        Ok(initial_len - entries.len())
    }

    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let entries = self.entries.read().unwrap();

        let mut sources: Vec<IndexedSource> = Vec::new();
        for entry in entries.iter() {
            match sources.iter_mut().find(|s| s.source_id == entry.source_id) {
                Some(source) => {
                    source.chunk_count += 1;
                    if entry.indexed_at > source.indexed_at {
                        source.indexed_at = entry.indexed_at;
                    }
                }
                None => sources.push(IndexedSource {
                    source_id: entry.source_id.clone(),
                    content_hash: entry.content_hash.clone(),
                    chunk_count: 1,
                    indexed_at: entry.indexed_at,
                }),
            }
        }

        sources.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(sources)
    }

    async fn get_source(&self, source_id: &str) -> Result<Option<IndexedSource>> {
        let sources = self.list_sources().await?;
        Ok(sources.into_iter().find(|s| s.source_id == source_id))
    }

    async fn source_hash(&self, source_id: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .find(|e| e.source_id == source_id)
            .map(|e| e.content_hash.clone()))
    }

    async fn get_by_source(&self, source_id: &str) -> Result<Vec<IndexEntry>> {
        let entries = self.entries.read().unwrap();
        let mut result: Vec<IndexEntry> = entries
            .iter()
            .filter(|e| e.source_id == source_id)
            .cloned()
            .collect();
        result.sort_by_key(|e| e.chunk_index);
        Ok(result)
    }

    async fn entry_count(&self) -> Result<usize> {
        let entries = self.entries.read().unwrap();
        Ok(entries.len())
    }

    async fn stored_model(&self) -> Result<Option<(String, usize)>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .first()
            .map(|e| (e.embedding_model.clone(), e.embedding.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, index: i64, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            source.to_string(),
            "hash-1".to_string(),
            index,
            index * 10,
            index * 10 + 10,
            format!("chunk {} of {}", index, source),
            embedding,
            "stub".to_string(),
        )
    }

    #[tokio::test]
    async fn test_replace_and_search() {
        let store = MemoryVectorStore::new();

        store
            .replace_source(
                "guide.pdf",
                &[
                    entry("guide.pdf", 0, vec![1.0, 0.0, 0.0]),
                    entry("guide.pdf", 1, vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.entry_count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].entry.chunk_index, 0);
    }

    #[tokio::test]
    async fn test_replace_source_removes_old_entries() {
        let store = MemoryVectorStore::new();

        store
            .replace_source(
                "guide.pdf",
                &[
                    entry("guide.pdf", 0, vec![1.0, 0.0, 0.0]),
                    entry("guide.pdf", 1, vec![0.0, 1.0, 0.0]),
                    entry("guide.pdf", 2, vec![0.0, 0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        store
            .replace_source("guide.pdf", &[entry("guide.pdf", 0, vec![0.5, 0.5, 0.0])])
            .await
            .unwrap();

        assert_eq!(store.entry_count().await.unwrap(), 1);
        let sources = store.list_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].chunk_count, 1);
    }

    #[tokio::test]
    async fn test_stable_tie_break_keeps_insertion_order() {
        let store = MemoryVectorStore::new();

        store
            .replace_source(
                "a.txt",
                &[
                    entry("a.txt", 0, vec![1.0, 0.0]),
                    entry("a.txt", 1, vec![1.0, 0.0]),
                    entry("a.txt", 2, vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10).await.unwrap();
        let order: Vec<i64> = results.iter().map(|r| r.entry.chunk_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_source_hash_and_model() {
        let store = MemoryVectorStore::new();
        assert!(store.stored_model().await.unwrap().is_none());
        assert!(store.source_hash("a.txt").await.unwrap().is_none());

        store
            .replace_source("a.txt", &[entry("a.txt", 0, vec![1.0, 0.0])])
            .await
            .unwrap();

        assert_eq!(
            store.source_hash("a.txt").await.unwrap(),
            Some("hash-1".to_string())
        );
        assert_eq!(
            store.stored_model().await.unwrap(),
            Some(("stub".to_string(), 2))
        );
    }
}
