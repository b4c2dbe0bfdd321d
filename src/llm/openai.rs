//! OpenAI chat completions backend.

use super::{LlmBackend, TokenStream};
use crate::error::{FinbotError, Result};
use crate::openai::{create_client, create_client_with_timeout};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, Stop,
};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Answer generation via the OpenAI chat completions API.
pub struct OpenAIBackend {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    stop: Vec<String>,
}

impl OpenAIBackend {
    /// Create a new OpenAI backend.
    pub fn new(model: String, temperature: f32, max_tokens: u32, stop: Vec<String>) -> Self {
        Self {
            client: create_client(),
            model,
            temperature,
            max_tokens,
            stop,
        }
    }

    /// Replace the client with one using a custom request timeout.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.client = create_client_with_timeout(timeout);
        self
    }

    fn build_request(&self, system: &str, user: &str) -> Result<CreateChatCompletionRequest> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.to_string())
                .build()
                .map_err(|e| FinbotError::Backend(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user.to_string())
                .build()
                .map_err(|e| FinbotError::Backend(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        if !self.stop.is_empty() {
            builder.stop(Stop::StringArray(self.stop.clone()));
        }
        builder
            .build()
            .map_err(|e| FinbotError::Backend(e.to_string()))
    }
}

#[async_trait]
impl LlmBackend for OpenAIBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let request = self.build_request(system, user)?;
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| FinbotError::Backend(e.to_string()))?;

        debug!("Received chat completion");

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| FinbotError::Backend("empty response from model".to_string()))
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate_stream(&self, system: &str, user: &str) -> Result<TokenStream> {
        let request = self.build_request(system, user)?;
        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| FinbotError::Backend(e.to_string()))?;

        let mapped = stream.map(|result| match result {
            Ok(response) => Ok(response
                .choices
                .first()
                .and_then(|c| c.delta.content.clone())
                .unwrap_or_default()),
            Err(e) => Err(FinbotError::Backend(e.to_string())),
        });

        Ok(Box::pin(mapped))
    }
}
