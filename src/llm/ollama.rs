//! Ollama backend for local models.
//!
//! Talks to the Ollama generate API. Streaming responses arrive as
//! newline-delimited JSON, one object per fragment.

use super::{LlmBackend, TokenStream};
use crate::error::{FinbotError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    system: String,
    temperature: f32,
    num_predict: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

/// Answer generation via a local Ollama server.
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaBackend {
    /// Create a new Ollama backend. Falls back to the default local
    /// endpoint when none is configured.
    pub fn new(model: String, endpoint: Option<&str>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).trim_end_matches('/').to_string(),
            model,
            temperature,
            max_tokens,
        }
    }

    fn build_request(&self, system: &str, user: &str, stream: bool) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            prompt: user.to_string(),
            system: system.to_string(),
            temperature: self.temperature,
            num_predict: self.max_tokens,
            stream,
        }
    }

    async fn send(&self, request: &GenerateRequest) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| FinbotError::Backend(format!("cannot reach Ollama at {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(FinbotError::Backend(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, system: &str, user: &str) -> Result<String> {
        let request = self.build_request(system, user, false);
        let response = self.send(&request).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FinbotError::Backend(format!("invalid Ollama response: {}", e)))?;

        debug!("Received completion from Ollama (done: {})", body.done);
        Ok(body.response)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate_stream(&self, system: &str, user: &str) -> Result<TokenStream> {
        let request = self.build_request(system, user, true);
        let response = self.send(&request).await?;

        // Each body chunk may carry several NDJSON lines; flatten them into
        // one fragment per line.
        let stream = response
            .bytes_stream()
            .map(|result| {
                let fragments: Vec<Result<String>> = match result {
                    Ok(bytes) => String::from_utf8_lossy(&bytes)
                        .lines()
                        .filter(|line| !line.trim().is_empty())
                        .map(|line| {
                            serde_json::from_str::<GenerateResponse>(line)
                                .map(|r| r.response)
                                .map_err(|e| {
                                    FinbotError::Backend(format!("invalid stream chunk: {}", e))
                                })
                        })
                        .collect(),
                    Err(e) => vec![Err(FinbotError::Backend(format!("stream error: {}", e)))],
                };
                futures::stream::iter(fragments)
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_defaults_and_trailing_slash() {
        let backend = OllamaBackend::new("llama3".to_string(), None, 0.3, 128);
        assert_eq!(backend.endpoint, "http://localhost:11434");

        let backend =
            OllamaBackend::new("llama3".to_string(), Some("http://box:11434/"), 0.3, 128);
        assert_eq!(backend.endpoint, "http://box:11434");
    }

    #[test]
    fn test_request_serialization() {
        let backend = OllamaBackend::new("llama3".to_string(), None, 0.2, 64);
        let request = backend.build_request("be terse", "what is a TFSA?", false);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3");
        assert_eq!(value["system"], "be terse");
        assert_eq!(value["num_predict"], 64);
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn test_response_line_parsing() {
        let line = r#"{"model":"llama3","response":"The TFSA","done":false}"#;
        let parsed: GenerateResponse = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.response, "The TFSA");
        assert!(!parsed.done);
    }
}
