//! The question-answering engine.
//!
//! Wires retrieval, prompt assembly, and generation into one ask path.
//! Every answer is grounded: the model only sees retrieved context, and the
//! response carries the exact sources that context came from.

use crate::config::Settings;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{FinbotError, Result};
use crate::llm::{create_backend, LlmBackend, TokenStream};
use crate::prompt::PromptAssembler;
use crate::retrieval::Retriever;
use crate::vector_store::{open_store, VectorStore};
use std::sync::Arc;
use tracing::{info, instrument};

/// A grounded answer with its citations.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// Generated answer text.
    pub answer: String,
    /// Source documents the prompt context came from. Empty when retrieval
    /// found nothing relevant.
    pub sources: Vec<String>,
}

/// A streaming answer: the token stream plus the citations, which are known
/// before the first token arrives.
pub struct StreamingResponse {
    /// Generated answer fragments.
    pub stream: TokenStream,
    /// Source documents the prompt context came from.
    pub sources: Vec<String>,
}

/// RAG engine for grounded question answering.
pub struct RagEngine {
    retriever: Retriever,
    assembler: PromptAssembler,
    backend: Arc<dyn LlmBackend>,
}

impl RagEngine {
    /// Create an engine with injected components.
    pub fn new(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        backend: Arc<dyn LlmBackend>,
    ) -> Result<Self> {
        Ok(Self {
            retriever: Retriever::new(settings, embedder, store),
            assembler: PromptAssembler::new(settings)?,
            backend,
        })
    }

    /// Create an engine from settings alone.
    pub fn from_settings(settings: &Settings, model_override: Option<&str>) -> Result<Self> {
        settings.validate()?;

        let embedder = create_embedder(settings);
        let store = open_store(settings)?;
        let backend = create_backend(settings, model_override)?;

        Self::new(settings, embedder, store, backend)
    }

    /// The backend this engine generates with.
    pub fn backend_model(&self) -> &str {
        self.backend.model()
    }

    /// Answer a question using retrieved context.
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<RagResponse> {
        let prompt = self.prepare(question).await?;
        let answer = self.backend.generate(&prompt.system, &prompt.user).await?;

        Ok(RagResponse {
            answer,
            sources: prompt.sources,
        })
    }

    /// Answer a question as a token stream.
    #[instrument(skip(self))]
    pub async fn ask_stream(&self, question: &str) -> Result<StreamingResponse> {
        let prompt = self.prepare(question).await?;
        let stream = self
            .backend
            .generate_stream(&prompt.system, &prompt.user)
            .await?;

        Ok(StreamingResponse {
            stream,
            sources: prompt.sources,
        })
    }

    async fn prepare(&self, question: &str) -> Result<crate::prompt::GroundedPrompt> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FinbotError::InvalidInput(
                "question cannot be empty".to_string(),
            ));
        }

        let retrieval = self.retriever.retrieve(question).await?;
        info!(
            "Answering with {} context chunks ({})",
            retrieval.chunks.len(),
            self.backend.name()
        );

        Ok(self.assembler.assemble(question, &retrieval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::StubEmbedder;
    use crate::vector_store::{IndexEntry, MemoryVectorStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that records the prompts it receives and returns a canned
    /// answer.
    struct RecordingBackend {
        seen: Mutex<Vec<(String, String)>>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last_user_prompt(&self) -> String {
            self.seen.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-stub"
        }

        async fn generate(&self, system: &str, user: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok("canned answer".to_string())
        }

        async fn generate_stream(&self, system: &str, user: &str) -> Result<TokenStream> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(Box::pin(futures::stream::iter(vec![
                Ok("canned ".to_string()),
                Ok("answer".to_string()),
            ])))
        }
    }

    fn test_settings() -> Settings {
        let mut settings = Settings::default();
        settings.embedding.dimensions = 32;
        settings.vector_store.provider = "memory".to_string();
        settings
    }

    async fn seeded_store(embedder: &StubEmbedder) -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        let content = "The TFSA annual contribution limit for 2024 is $7,000.";
        let embedding = embedder.embed(content).await.unwrap();
        store
            .replace_source(
                "cra/tfsa.txt",
                &[IndexEntry::new(
                    "cra/tfsa.txt".to_string(),
                    "hash".to_string(),
                    0,
                    0,
                    content.len() as i64,
                    content.to_string(),
                    embedding,
                    "stub".to_string(),
                )],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_ask_returns_answer_with_citations() {
        let store = seeded_store(&StubEmbedder::new(32)).await;
        let backend = Arc::new(RecordingBackend::new());
        let engine = RagEngine::new(
            &test_settings(),
            Arc::new(StubEmbedder::new(32)),
            store,
            backend.clone(),
        )
        .unwrap();

        let response = engine.ask("What is the TFSA contribution limit?").await.unwrap();

        assert_eq!(response.answer, "canned answer");
        assert_eq!(response.sources, vec!["cra/tfsa.txt"]);
        assert!(backend.last_user_prompt().contains("$7,000"));
    }

    #[tokio::test]
    async fn test_empty_index_yields_no_context_prompt_and_no_citations() {
        let backend = Arc::new(RecordingBackend::new());
        let engine = RagEngine::new(
            &test_settings(),
            Arc::new(StubEmbedder::new(32)),
            Arc::new(MemoryVectorStore::new()),
            backend.clone(),
        )
        .unwrap();

        let response = engine.ask("What is a TFSA?").await.unwrap();

        assert!(response.sources.is_empty());
        assert!(backend.last_user_prompt().contains("No relevant documents"));
        assert!(!backend.last_user_prompt().contains("[Source:"));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let engine = RagEngine::new(
            &test_settings(),
            Arc::new(StubEmbedder::new(32)),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(RecordingBackend::new()),
        )
        .unwrap();

        let err = engine.ask("   ").await.unwrap_err();
        assert!(matches!(err, FinbotError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ask_stream_knows_sources_before_tokens() {
        use futures::StreamExt;

        let store = seeded_store(&StubEmbedder::new(32)).await;
        let engine = RagEngine::new(
            &test_settings(),
            Arc::new(StubEmbedder::new(32)),
            store,
            Arc::new(RecordingBackend::new()),
        )
        .unwrap();

        let mut response = engine.ask_stream("TFSA contribution limit?").await.unwrap();
        assert_eq!(response.sources, vec!["cra/tfsa.txt"]);

        let mut answer = String::new();
        while let Some(fragment) = response.stream.next().await {
            answer.push_str(&fragment.unwrap());
        }
        assert_eq!(answer, "canned answer");
    }
}
