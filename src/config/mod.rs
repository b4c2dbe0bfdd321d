//! Configuration management for FinBot.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, EmbeddingSettings, GeneralSettings, LlmBackendKind, LlmSettings,
    PromptSettings, RetrievalSettings, Settings, VectorStoreSettings,
};
