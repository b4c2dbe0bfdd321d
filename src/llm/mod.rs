//! Answer generation backends.
//!
//! A backend takes an assembled prompt and produces text, either whole or
//! as a token stream. Which backend runs is a configuration choice; the
//! RAG engine only sees the trait.

mod ollama;
mod openai;

pub use ollama::OllamaBackend;
pub use openai::OpenAIBackend;

use crate::config::{LlmBackendKind, Settings};
use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// A stream of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for answer generation backends.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Backend name for display and logging.
    fn name(&self) -> &str;

    /// Model identifier this backend generates with.
    fn model(&self) -> &str;

    /// Generate a complete answer for a system/user prompt pair.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;

    /// Generate an answer as a stream of text fragments.
    async fn generate_stream(&self, system: &str, user: &str) -> Result<TokenStream>;
}

/// Create the backend selected by configuration.
///
/// `model_override` takes precedence over the configured model, so a single
/// invocation can try a different model without editing the config file.
pub fn create_backend(
    settings: &Settings,
    model_override: Option<&str>,
) -> Result<Arc<dyn LlmBackend>> {
    let model = model_override.unwrap_or(&settings.llm.model).to_string();

    Ok(match settings.llm.backend {
        LlmBackendKind::Openai => Arc::new(
            OpenAIBackend::new(
                model,
                settings.llm.temperature,
                settings.llm.max_tokens,
                settings.llm.stop.clone(),
            )
            .with_timeout(std::time::Duration::from_secs(
                settings.general.request_timeout_secs,
            )),
        ),
        LlmBackendKind::Ollama => Arc::new(OllamaBackend::new(
            model,
            settings.llm.endpoint.as_deref(),
            settings.llm.temperature,
            settings.llm.max_tokens,
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_configured_backend() {
        let mut settings = Settings::default();
        let backend = create_backend(&settings, None).unwrap();
        assert_eq!(backend.name(), "openai");
        assert_eq!(backend.model(), "gpt-4o-mini");

        settings.llm.backend = LlmBackendKind::Ollama;
        settings.llm.model = "llama3".to_string();
        let backend = create_backend(&settings, None).unwrap();
        assert_eq!(backend.name(), "ollama");
        assert_eq!(backend.model(), "llama3");
    }

    #[test]
    fn test_factory_model_override() {
        let settings = Settings::default();
        let backend = create_backend(&settings, Some("gpt-4o")).unwrap();
        assert_eq!(backend.model(), "gpt-4o");
    }
}
