//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For production use cases with large corpora, consider the sqlite-vec
//! extension or a dedicated vector database.

use super::{cosine_similarity, IndexEntry, IndexedSource, SearchResult, VectorStore};
use crate::error::{FinbotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    start_offset INTEGER NOT NULL,
    end_offset INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    embedding_model TEXT NOT NULL,
    indexed_at TEXT NOT NULL,
    UNIQUE(source_id, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_entries_source_id ON entries(source_id);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FinbotError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexEntry> {
        let id_str: String = row.get(0)?;
        let embedding_bytes: Vec<u8> = row.get(7)?;
        let indexed_at_str: String = row.get(9)?;

        Ok(IndexEntry {
            id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
            source_id: row.get(1)?,
            content_hash: row.get(2)?,
            chunk_index: row.get(3)?,
            start_offset: row.get(4)?,
            end_offset: row.get(5)?,
            content: row.get(6)?,
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            embedding_model: row.get(8)?,
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

const SELECT_COLUMNS: &str = "id, source_id, content_hash, chunk_index, start_offset, \
                              end_offset, content, embedding, embedding_model, indexed_at";

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn replace_source(&self, source_id: &str, entries: &[IndexEntry]) -> Result<usize> {
        let conn = self.lock_conn()?;

        // Delete and insert in one transaction: a concurrent reader sees the
        // old complete entry set or the new one, never a partial write.
        let tx = conn.unchecked_transaction()?;

        tx.execute("DELETE FROM entries WHERE source_id = ?1", params![source_id])?;

        for entry in entries {
            let embedding_bytes = Self::embedding_to_bytes(&entry.embedding);

            tx.execute(
                r#"
                INSERT INTO entries
                (id, source_id, content_hash, chunk_index, start_offset, end_offset,
                 content, embedding, embedding_model, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    entry.id.to_string(),
                    entry.source_id,
                    entry.content_hash,
                    entry.chunk_index,
                    entry.start_offset,
                    entry.end_offset,
                    entry.content,
                    embedding_bytes,
                    entry.embedding_model,
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Replaced {} entries for source {}", entries.len(), source_id);
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(query_embedding, limit, f32::MIN).await
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock_conn()?;

        // rowid order is insertion order, which keeps equal-score ties stable.
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries ORDER BY rowid",
            SELECT_COLUMNS
        ))?;

        let entries = stmt.query_map([], Self::row_to_entry)?;

        let mut results: Vec<SearchResult> = entries
            .filter_map(|entry_result| entry_result.ok())
            .map(|entry| {
                let score = cosine_similarity(query_embedding, &entry.embedding);
                SearchResult { entry, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching entries", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_by_source(&self, source_id: &str) -> Result<usize> {
        let conn = self.lock_conn()?;

        let deleted = conn.execute(
            "DELETE FROM entries WHERE source_id = ?1",
            params![source_id],
        )?;

        info!("Deleted {} entries for source {}", deleted, source_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_sources(&self) -> Result<Vec<IndexedSource>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT source_id, content_hash, COUNT(*) as chunk_count,
                   MAX(indexed_at) as indexed_at
            FROM entries
            GROUP BY source_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let sources = stmt.query_map([], |row| {
            let indexed_at_str: String = row.get(3)?;
            Ok(IndexedSource {
                source_id: row.get(0)?,
                content_hash: row.get(1)?,
                chunk_count: row.get(2)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let result: Vec<IndexedSource> = sources.filter_map(|s| s.ok()).collect();
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_source(&self, source_id: &str) -> Result<Option<IndexedSource>> {
        let conn = self.lock_conn()?;

        let source = conn.query_row(
            r#"
            SELECT source_id, content_hash, COUNT(*) as chunk_count,
                   MAX(indexed_at) as indexed_at
            FROM entries
            WHERE source_id = ?1
            GROUP BY source_id
            "#,
            params![source_id],
            |row| {
                let indexed_at_str: String = row.get(3)?;
                Ok(IndexedSource {
                    source_id: row.get(0)?,
                    content_hash: row.get(1)?,
                    chunk_count: row.get(2)?,
                    indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            },
        );

        match source {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn source_hash(&self, source_id: &str) -> Result<Option<String>> {
        let conn = self.lock_conn()?;

        let hash = conn.query_row(
            "SELECT content_hash FROM entries WHERE source_id = ?1 LIMIT 1",
            params![source_id],
            |row| row.get::<_, String>(0),
        );

        match hash {
            Ok(h) => Ok(Some(h)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn get_by_source(&self, source_id: &str) -> Result<Vec<IndexEntry>> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries WHERE source_id = ?1 ORDER BY chunk_index",
            SELECT_COLUMNS
        ))?;

        let entries = stmt.query_map(params![source_id], Self::row_to_entry)?;

        let result: Vec<IndexEntry> = entries.filter_map(|e| e.ok()).collect();
        debug!("Found {} entries for source {}", result.len(), source_id);
        Ok(result)
    }

    async fn entry_count(&self) -> Result<usize> {
        let conn = self.lock_conn()?;

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn stored_model(&self) -> Result<Option<(String, usize)>> {
        let conn = self.lock_conn()?;

        let row = conn.query_row(
            "SELECT embedding_model, LENGTH(embedding) FROM entries ORDER BY rowid LIMIT 1",
            [],
            |row| {
                let model: String = row.get(0)?;
                let byte_len: i64 = row.get(1)?;
                Ok((model, byte_len))
            },
        );

        match row {
            Ok((model, byte_len)) => Ok(Some((model, byte_len as usize / 4))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
