//! Configuration settings for FinBot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Timeout for OpenAI API requests, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.finbot".to_string(),
            log_level: "info".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Document chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub size: usize,
    /// Overlap between consecutive chunks in characters. Must be less than `size`.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            size: 200,
            overlap: 50,
        }
    }
}

/// Embedding generation settings.
///
/// The model and its dimensionality are process-wide: every stored embedding
/// must come from the same model, or retrieval results are meaningless.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.finbot/index.db".to_string(),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of highest-similarity chunks to retrieve per query.
    pub top_k: usize,
    /// Minimum similarity score (0.0-1.0) for a chunk to be considered.
    pub min_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_score: 0.0,
        }
    }
}

/// LLM backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackendKind {
    /// OpenAI chat completions API.
    #[default]
    Openai,
    /// Local model served by Ollama.
    Ollama,
}

impl std::str::FromStr for LlmBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LlmBackendKind::Openai),
            "ollama" | "local" => Ok(LlmBackendKind::Ollama),
            _ => Err(format!("Unknown LLM backend: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmBackendKind::Openai => write!(f, "openai"),
            LlmBackendKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// LLM generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend to use for answer generation (openai, ollama).
    pub backend: LlmBackendKind,
    /// Model identifier for the selected backend.
    pub model: String,
    /// Endpoint override (used by the ollama backend).
    pub endpoint: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate per answer.
    pub max_tokens: u32,
    /// Stop sequences for generation.
    pub stop: Vec<String>,
    /// Prompt context budget in characters. Retrieved chunks that would
    /// exceed this budget are dropped whole.
    pub context_budget: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: LlmBackendKind::Openai,
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            temperature: 0.3,
            max_tokens: 128,
            stop: vec![
                "### Question".to_string(),
                "### Answer".to_string(),
                "\n\n---".to_string(),
            ],
            context_budget: 4000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration invariants.
    ///
    /// Called before any I/O: a bad configuration must stop the process up
    /// front rather than surface as a degraded pipeline later.
    pub fn validate(&self) -> crate::error::Result<()> {
        let mut errors = Vec::new();

        if self.chunking.size == 0 {
            errors.push("chunking.size must be greater than zero".to_string());
        }
        if self.chunking.overlap >= self.chunking.size {
            errors.push(format!(
                "chunking.overlap ({}) must be less than chunking.size ({})",
                self.chunking.overlap, self.chunking.size
            ));
        }
        if self.embedding.dimensions == 0 {
            errors.push("embedding.dimensions must be greater than zero".to_string());
        }
        if self.retrieval.top_k == 0 {
            errors.push("retrieval.top_k must be greater than zero".to_string());
        }
        if self.llm.context_budget == 0 {
            errors.push("llm.context_budget must be greater than zero".to_string());
        }
        if self.general.request_timeout_secs == 0 {
            errors.push("general.request_timeout_secs must be greater than zero".to_string());
        }
        if !matches!(self.vector_store.provider.as_str(), "sqlite" | "memory") {
            errors.push(format!(
                "unknown vector_store.provider: {}",
                self.vector_store.provider
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(crate::error::FinbotError::Config(errors.join("; ")))
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::FinbotError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finbot")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}
