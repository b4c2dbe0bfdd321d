//! Prompt templates for FinBot.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for RAG answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    pub system: String,
    pub user: String,
    /// Used when retrieval found nothing: the model must say so instead of
    /// answering from memory.
    pub no_context: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful Canadian financial expert assistant.
Answer the user's question using only the provided context from government documents.

Guidelines:
- Give a clear, concise answer grounded in the context
- Cite sources using the [Source: <name>] tags shown with each excerpt
- If the answer isn't in the context, say "I don't have that information in the provided documents."
- Never invent figures, limits, or dates that do not appear in the context"#
                .to_string(),

            user: r#"Context:
{{context}}

Question: {{question}}"#
                .to_string(),

            no_context: r#"No relevant documents were found for the user's question.

Question: {{question}}

Tell the user that no relevant information was found in the indexed documents. Do not answer the question from memory, and do not cite any sources."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(!prompts.rag.system.is_empty());
        assert!(prompts.rag.no_context.contains("{{question}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Context:\n{{context}}\n\nQuestion: {{question}}";
        let mut vars = std::collections::HashMap::new();
        vars.insert("context".to_string(), "TFSA limits".to_string());
        vars.insert("question".to_string(), "What is a TFSA?".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Context:\nTFSA limits\n\nQuestion: What is a TFSA?");
    }

    #[test]
    fn test_custom_variables_do_not_override_provided() {
        let mut prompts = Prompts::default();
        prompts
            .variables
            .insert("question".to_string(), "from config".to_string());

        let mut vars = std::collections::HashMap::new();
        vars.insert("question".to_string(), "from caller".to_string());

        let result = prompts.render_with_custom("Q: {{question}}", &vars);
        assert_eq!(result, "Q: from caller");
    }
}
