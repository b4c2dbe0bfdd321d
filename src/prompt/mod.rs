//! Grounded prompt assembly.
//!
//! Turns retrieved chunks into an LLM prompt under a character budget.
//! Chunks are taken in score order and included whole or not at all; the
//! first chunk that would overflow the budget stops inclusion. The list of
//! cited sources traces exactly the chunks that made it into the prompt,
//! never the ones that were retrieved but dropped.

use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::retrieval::{RetrievalResult, ScoredChunk};
use std::collections::HashMap;
use tracing::debug;

/// A fully assembled prompt with its citation trail.
#[derive(Debug, Clone)]
pub struct GroundedPrompt {
    /// System message for the LLM.
    pub system: String,
    /// User message containing the context block and the question.
    pub user: String,
    /// Source identities of the chunks actually included, deduplicated and
    /// in inclusion order. Empty when the prompt carries no context.
    pub sources: Vec<String>,
}

impl GroundedPrompt {
    /// Whether any retrieved context made it into the prompt.
    pub fn has_context(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Assembles grounded prompts from retrieval results.
pub struct PromptAssembler {
    prompts: Prompts,
    context_budget: usize,
}

impl PromptAssembler {
    /// Create an assembler from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        Ok(Self {
            prompts,
            context_budget: settings.llm.context_budget,
        })
    }

    /// Create an assembler with explicit prompts and budget.
    pub fn with_prompts(prompts: Prompts, context_budget: usize) -> Self {
        Self {
            prompts,
            context_budget,
        }
    }

    /// Assemble a prompt for a question and its retrieval result.
    ///
    /// An empty retrieval result produces the no-context prompt, which
    /// instructs the model to say nothing was found rather than answer
    /// from its own knowledge.
    pub fn assemble(&self, question: &str, retrieval: &RetrievalResult) -> GroundedPrompt {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());

        if retrieval.is_empty() {
            return GroundedPrompt {
                system: self.prompts.rag.system.clone(),
                user: self
                    .prompts
                    .render_with_custom(&self.prompts.rag.no_context, &vars),
                sources: Vec::new(),
            };
        }

        let (context, sources) = self.build_context(&retrieval.chunks);

        // Every chunk overflowed the budget. Same contract as an empty
        // retrieval: no context, no citations.
        if sources.is_empty() {
            debug!("Context budget {} admitted no chunks", self.context_budget);
            return GroundedPrompt {
                system: self.prompts.rag.system.clone(),
                user: self
                    .prompts
                    .render_with_custom(&self.prompts.rag.no_context, &vars),
                sources: Vec::new(),
            };
        }

        vars.insert("context".to_string(), context);
        GroundedPrompt {
            system: self.prompts.rag.system.clone(),
            user: self.prompts.render_with_custom(&self.prompts.rag.user, &vars),
            sources,
        }
    }

    /// Build the context block and the matching citation list.
    fn build_context(&self, chunks: &[ScoredChunk]) -> (String, Vec<String>) {
        let mut blocks: Vec<String> = Vec::new();
        let mut sources: Vec<String> = Vec::new();
        let mut used = 0usize;

        for chunk in chunks {
            let block = format!("[Source: {}]\n{}", chunk.source_id, chunk.content);
            let cost = block.chars().count();

            // Whole chunk or nothing; the first overflow ends inclusion so
            // lower-scored chunks cannot leapfrog a dropped one.
            if used + cost > self.context_budget {
                debug!(
                    "Dropping chunk {} of {} ({} chars over budget)",
                    chunk.chunk_index,
                    chunk.source_id,
                    used + cost - self.context_budget
                );
                break;
            }

            used += cost;
            blocks.push(block);
            if !sources.contains(&chunk.source_id) {
                sources.push(chunk.source_id.clone());
            }
        }

        (blocks.join("\n\n"), sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, index: i64, content: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            content: content.to_string(),
            score,
            source_id: source.to_string(),
            chunk_index: index,
        }
    }

    fn assembler(budget: usize) -> PromptAssembler {
        PromptAssembler::with_prompts(Prompts::default(), budget)
    }

    #[test]
    fn test_context_and_question_appear_in_user_prompt() {
        let retrieval = RetrievalResult {
            chunks: vec![chunk(
                "cra/tfsa-guide.txt",
                0,
                "The TFSA annual contribution limit for 2024 is $7,000.",
                0.9,
            )],
        };

        let prompt = assembler(4000).assemble("What is the TFSA limit?", &retrieval);

        assert!(prompt.has_context());
        assert!(prompt.user.contains("What is the TFSA limit?"));
        assert!(prompt.user.contains("$7,000"));
        assert!(prompt.user.contains("[Source: cra/tfsa-guide.txt]"));
        assert_eq!(prompt.sources, vec!["cra/tfsa-guide.txt"]);
    }

    #[test]
    fn test_empty_retrieval_uses_no_context_prompt() {
        let prompt = assembler(4000).assemble("What is a TFSA?", &RetrievalResult::default());

        assert!(!prompt.has_context());
        assert!(prompt.sources.is_empty());
        assert!(prompt.user.contains("What is a TFSA?"));
        assert!(prompt.user.contains("No relevant documents"));
        // No context block, no source tags.
        assert!(!prompt.user.contains("[Source:"));
    }

    #[test]
    fn test_budget_drops_whole_chunks() {
        let retrieval = RetrievalResult {
            chunks: vec![
                chunk("a.txt", 0, &"x".repeat(100), 0.9),
                chunk("b.txt", 0, &"y".repeat(100), 0.8),
                chunk("c.txt", 0, &"z".repeat(100), 0.7),
            ],
        };

        // Room for two blocks, not three. Each block is content plus its
        // source tag line.
        let prompt = assembler(250).assemble("q", &retrieval);

        assert_eq!(prompt.sources, vec!["a.txt", "b.txt"]);
        assert!(prompt.user.contains(&"x".repeat(100)));
        assert!(prompt.user.contains(&"y".repeat(100)));
        assert!(!prompt.user.contains(&"z".repeat(100)));
    }

    #[test]
    fn test_overflow_stops_inclusion_for_later_chunks() {
        let retrieval = RetrievalResult {
            chunks: vec![
                chunk("big.txt", 0, &"x".repeat(300), 0.9),
                chunk("small.txt", 0, "tiny", 0.8),
            ],
        };

        // The big chunk overflows; the small one must not sneak in behind it.
        let prompt = assembler(100).assemble("q", &retrieval);

        assert!(!prompt.has_context());
        assert!(!prompt.user.contains("tiny"));
    }

    #[test]
    fn test_citations_trace_only_included_chunks() {
        let retrieval = RetrievalResult {
            chunks: vec![
                chunk("kept.txt", 0, "short chunk", 0.9),
                chunk("dropped.txt", 0, &"w".repeat(5000), 0.8),
            ],
        };

        let prompt = assembler(200).assemble("q", &retrieval);

        assert_eq!(prompt.sources, vec!["kept.txt"]);
        assert!(!prompt.sources.contains(&"dropped.txt".to_string()));
    }

    #[test]
    fn test_sources_deduplicated_in_inclusion_order() {
        let retrieval = RetrievalResult {
            chunks: vec![
                chunk("guide.txt", 2, "second chunk", 0.9),
                chunk("rates.txt", 0, "rates chunk", 0.8),
                chunk("guide.txt", 5, "fifth chunk", 0.7),
            ],
        };

        let prompt = assembler(4000).assemble("q", &retrieval);
        assert_eq!(prompt.sources, vec!["guide.txt", "rates.txt"]);
    }
}
