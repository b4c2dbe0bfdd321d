//! Document ingestion pipeline for FinBot.
//!
//! Drives extraction, chunking, embedding, and index writes for a batch of
//! documents. Ingestion is idempotent per document: an unchanged content
//! hash is a no-op, a changed hash replaces every prior entry for that
//! source, and one bad document never aborts the batch.

use crate::chunking::chunk_text;
use crate::config::Settings;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{FinbotError, Result};
use crate::extraction::{extract_text, list_documents};
use crate::vector_store::{open_store, IndexEntry, VectorStore};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A document prepared for ingestion.
///
/// Immutable once created; the content hash is what makes re-ingestion
/// idempotent.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source identity (path or URI).
    pub source_id: String,
    /// Raw extracted text.
    pub text: String,
    /// SHA-256 hex digest of the text.
    pub content_hash: String,
}

impl Document {
    /// Create a document from extracted text, computing its content hash.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let content_hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        Self {
            source_id: source_id.into(),
            text,
            content_hash,
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestionReport {
    /// Documents chunked, embedded, and written to the index.
    pub added: usize,
    /// Documents skipped because their content hash was already indexed.
    pub skipped: usize,
    /// Documents that failed extraction, embedding, or indexing.
    pub failed: usize,
    /// Per-document failure descriptions.
    pub failures: Vec<(String, String)>,
}

impl IngestionReport {
    fn record_failure(&mut self, source_id: &str, error: &FinbotError) {
        warn!("Ingestion failed for {}: {}", source_id, error);
        self.failed += 1;
        self.failures.push((source_id.to_string(), error.to_string()));
    }
}

/// The ingestion orchestrator.
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunk_size: usize,
    chunk_overlap: usize,
    force: bool,
}

impl Ingestor {
    /// Create an ingestor from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Self::with_components(settings, create_embedder(settings), open_store(settings)?)
    }

    /// Create an ingestor with injected components.
    pub fn with_components(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        if embedder.dimensions() != settings.embedding.dimensions as usize {
            return Err(FinbotError::Config(format!(
                "embedder dimensionality ({}) does not match configured dimensions ({})",
                embedder.dimensions(),
                settings.embedding.dimensions
            )));
        }

        Ok(Self {
            embedder,
            store,
            chunk_size: settings.chunking.size,
            chunk_overlap: settings.chunking.overlap,
            force: false,
        })
    }

    /// Re-ingest documents even when their content hash is unchanged.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Get a reference to the vector store.
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.clone()
    }

    /// Get a reference to the embedder.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    /// Ingest all supported documents under a directory.
    ///
    /// Extraction failures are per-document: a corrupt file is reported in
    /// the result and the rest of the batch proceeds.
    #[instrument(skip(self), fields(dir = %dir.as_ref().display()))]
    pub async fn ingest_dir(&self, dir: impl AsRef<Path>) -> Result<IngestionReport> {
        let paths = list_documents(dir.as_ref())?;
        info!("Found {} documents under {}", paths.len(), dir.as_ref().display());

        let mut documents = Vec::new();
        let mut report = IngestionReport::default();

        for path in paths {
            let source_id = path.display().to_string();
            match extract_text(&path) {
                Ok(text) => documents.push(Document::new(source_id, text)),
                Err(e) => report.record_failure(&source_id, &e),
            }
        }

        let ingested = self.ingest(&documents).await?;
        report.added += ingested.added;
        report.skipped += ingested.skipped;
        report.failed += ingested.failed;
        report.failures.extend(ingested.failures);
        Ok(report)
    }

    /// Ingest a batch of documents.
    ///
    /// The write-path guard against cross-model contamination: before any
    /// write, the store's recorded model identity must match the embedder.
    #[instrument(skip_all, fields(count = documents.len()))]
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestionReport> {
        if let Some((stored_model, stored_dims)) = self.store.stored_model().await? {
            if stored_model != self.embedder.model_id()
                || stored_dims != self.embedder.dimensions()
            {
                return Err(FinbotError::Config(format!(
                    "index was built with model '{}' ({} dims) but embedder is '{}' ({} dims)",
                    stored_model,
                    stored_dims,
                    self.embedder.model_id(),
                    self.embedder.dimensions()
                )));
            }
        }

        let mut report = IngestionReport::default();

        for document in documents {
            match self.ingest_one(document).await {
                Ok(IngestOutcome::Added(count)) => {
                    info!("Indexed {} chunks from {}", count, document.source_id);
                    report.added += 1;
                }
                Ok(IngestOutcome::Skipped) => {
                    debug!("Skipping unchanged document {}", document.source_id);
                    report.skipped += 1;
                }
                // Fatal misconfiguration stops the batch; everything else is
                // captured per document.
                Err(e @ FinbotError::Config(_)) => return Err(e),
                Err(e) => report.record_failure(&document.source_id, &e),
            }
        }

        info!(
            "Ingestion complete: {} added, {} skipped, {} failed",
            report.added, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Ingest a single document: hash check, chunk, embed, atomic write.
    async fn ingest_one(&self, document: &Document) -> Result<IngestOutcome> {
        if !self.force {
            if let Some(stored) = self.store.source_hash(&document.source_id).await? {
                if stored == document.content_hash {
                    return Ok(IngestOutcome::Skipped);
                }
                debug!(
                    "Content hash changed for {}, replacing entries",
                    document.source_id
                );
            }
        }

        let chunks = chunk_text(&document.text, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            // A previously indexed document that changed to empty still
            // replaces its old entries; nothing stale stays retrievable.
            if self.store.source_hash(&document.source_id).await?.is_some() {
                let deleted = self.store.delete_by_source(&document.source_id).await?;
                debug!(
                    "Document {} is now empty, removed {} entries",
                    document.source_id, deleted
                );
                return Ok(IngestOutcome::Added(0));
            }
            return Ok(IngestOutcome::Skipped);
        }

        // One batched call; a failure here leaves the store untouched.
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(FinbotError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }
        for embedding in &embeddings {
            if embedding.len() != self.embedder.dimensions() {
                return Err(FinbotError::Embedding(format!(
                    "embedding has {} dims, expected {}",
                    embedding.len(),
                    self.embedder.dimensions()
                )));
            }
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| {
                IndexEntry::new(
                    document.source_id.clone(),
                    document.content_hash.clone(),
                    chunk.index as i64,
                    chunk.start as i64,
                    chunk.end as i64,
                    chunk.content,
                    embedding,
                    self.embedder.model_id().to_string(),
                )
            })
            .collect();

        // All entries for the document land in one atomic replace, so a
        // concurrent reader never observes a partial set.
        let written = self.store.replace_source(&document.source_id, &entries).await?;
        Ok(IngestOutcome::Added(written))
    }
}

enum IngestOutcome {
    Added(usize),
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{FailingEmbedder, StubEmbedder};
    use crate::vector_store::MemoryVectorStore;

    fn test_settings(dimensions: u32) -> Settings {
        let mut settings = Settings::default();
        settings.chunking.size = 200;
        settings.chunking.overlap = 50;
        settings.embedding.dimensions = dimensions;
        settings.vector_store.provider = "memory".to_string();
        settings
    }

    fn test_ingestor() -> (Ingestor, Arc<MemoryVectorStore>) {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = Ingestor::with_components(
            &test_settings(16),
            Arc::new(StubEmbedder::new(16)),
            store.clone(),
        )
        .unwrap();
        (ingestor, store)
    }

    #[tokio::test]
    async fn test_ingest_thousand_char_document() {
        let (ingestor, store) = test_ingestor();
        let text: String = "the TFSA contribution room grows each year "
            .chars()
            .cycle()
            .take(1000)
            .collect();

        let report = ingestor
            .ingest(&[Document::new("cra/guide.txt", text)])
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.failed, 0);
        // size=200, overlap=50: a 1000-char document yields 7 chunks.
        assert_eq!(store.entry_count().await.unwrap(), 7);

        let entries = store.get_by_source("cra/guide.txt").await.unwrap();
        let indices: Vec<i64> = entries.iter().map(|e| e.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_reingest_unchanged_is_noop() {
        let (ingestor, store) = test_ingestor();
        let doc = Document::new("budget.html", "federal budget highlights ".repeat(30));

        let first = ingestor.ingest(std::slice::from_ref(&doc)).await.unwrap();
        assert_eq!(first.added, 1);
        let count = store.entry_count().await.unwrap();
        let before = store.get_by_source("budget.html").await.unwrap();

        let second = ingestor.ingest(std::slice::from_ref(&doc)).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.entry_count().await.unwrap(), count);

        // Entry content (and ids) untouched.
        let after = store.get_by_source("budget.html").await.unwrap();
        let before_ids: Vec<_> = before.iter().map(|e| e.id).collect();
        let after_ids: Vec<_> = after.iter().map(|e| e.id).collect();
        assert_eq!(before_ids, after_ids);
    }

    #[tokio::test]
    async fn test_reingest_changed_replaces_all_entries() {
        let (ingestor, store) = test_ingestor();

        let old = Document::new("rates.txt", "prescribed interest rate is 5% ".repeat(40));
        ingestor.ingest(&[old.clone()]).await.unwrap();
        let old_hash = old.content_hash.clone();

        let new = Document::new("rates.txt", "prescribed interest rate is 6% ".repeat(10));
        let report = ingestor.ingest(&[new.clone()]).await.unwrap();
        assert_eq!(report.added, 1);

        let entries = store.get_by_source("rates.txt").await.unwrap();
        assert!(!entries.is_empty());
        for entry in &entries {
            assert_eq!(entry.content_hash, new.content_hash);
            assert_ne!(entry.content_hash, old_hash);
        }
    }

    #[tokio::test]
    async fn test_one_bad_document_does_not_abort_batch() {
        let store = Arc::new(MemoryVectorStore::new());
        let failing = Ingestor::with_components(
            &test_settings(8),
            Arc::new(FailingEmbedder),
            store.clone(),
        )
        .unwrap();

        let report = failing
            .ingest(&[
                Document::new("a.txt", "some text about OAS payments"),
                Document::new("b.txt", "some text about CPP benefits"),
            ])
            .await
            .unwrap();

        assert_eq!(report.added, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(report.failures.len(), 2);
        // Failed documents leave nothing behind.
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_document_is_skipped() {
        let (ingestor, store) = test_ingestor();

        let report = ingestor
            .ingest(&[Document::new("empty.txt", "   \n ")])
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(store.entry_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingest_changed_to_empty_removes_entries() {
        let (ingestor, store) = test_ingestor();

        ingestor
            .ingest(&[Document::new(
                "limits.txt",
                "old content about TFSA limits ".repeat(20),
            )])
            .await
            .unwrap();
        assert!(store.entry_count().await.unwrap() > 0);

        // The document now chunks to nothing; its old entries must go.
        let report = ingestor
            .ingest(&[Document::new("limits.txt", "   \n  ")])
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.entry_count().await.unwrap(), 0);
        assert!(store.get_by_source("limits.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_mismatch_is_fatal_config_error() {
        let store = Arc::new(MemoryVectorStore::new());

        // Index built with a 16-dim stub...
        let first = Ingestor::with_components(
            &test_settings(16),
            Arc::new(StubEmbedder::new(16)),
            store.clone(),
        )
        .unwrap();
        first
            .ingest(&[Document::new("a.txt", "registered retirement savings plan")])
            .await
            .unwrap();

        // ...cannot be extended with an 8-dim one.
        let second = Ingestor::with_components(
            &test_settings(8),
            Arc::new(StubEmbedder::new(8)),
            store.clone(),
        )
        .unwrap();
        let err = second
            .ingest(&[Document::new("b.txt", "tax free savings account")])
            .await
            .unwrap_err();
        assert!(matches!(err, FinbotError::Config(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_with_settings_rejected() {
        let result = Ingestor::with_components(
            &test_settings(32),
            Arc::new(StubEmbedder::new(16)),
            Arc::new(MemoryVectorStore::new()),
        );
        assert!(matches!(result.err(), Some(FinbotError::Config(_))));
    }

    #[test]
    fn test_document_hash_is_stable() {
        let a = Document::new("x", "same text");
        let b = Document::new("x", "same text");
        let c = Document::new("x", "different text");
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(a.content_hash, c.content_hash);
    }
}
