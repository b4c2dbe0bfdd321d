//! FinBot - Canadian Financial Assistant
//!
//! A privacy-focused, locally-hosted assistant that answers questions about
//! Canadian financial topics using retrieval-augmented generation.
//!
//! # Overview
//!
//! FinBot allows you to:
//! - Ingest government documents (PDF, HTML, plain text) into a local vector index
//! - Ask finance questions and get grounded answers with source citations
//! - Search the document corpus semantically
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `extraction` - Document text extraction (PDF, HTML, plain text)
//! - `chunking` - Splitting documents into overlapping passages
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `ingestion` - Document ingestion pipeline
//! - `retrieval` - Similarity retrieval
//! - `prompt` - Grounded prompt assembly
//! - `llm` - LLM backend abstraction (OpenAI, Ollama)
//! - `rag` - RAG engine for question answering
//!
//! # Example
//!
//! ```rust,no_run
//! use finbot::config::Settings;
//! use finbot::ingestion::Ingestor;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let ingestor = Ingestor::new(&settings)?;
//!
//!     // Ingest all documents under a directory
//!     let report = ingestor.ingest_dir("data/raw").await?;
//!     println!("Indexed {} documents", report.added);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod ingestion;
pub mod llm;
pub mod openai;
pub mod prompt;
pub mod rag;
pub mod retrieval;
pub mod vector_store;

pub use error::{FinbotError, Result};
