//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials are available before starting
//! operations that would otherwise fail midway.

use crate::error::{FinbotError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion embeds every chunk.
    Ingest,
    /// Asking embeds the query and calls the generation backend.
    Ask,
    /// Search embeds the query.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    // Every operation embeds text, so all of them need the API key. The
    // Ollama generation backend is local; its reachability is reported on
    // first use rather than probed here.
    match operation {
        Operation::Ingest | Operation::Ask | Operation::Search => check_api_key()?,
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(FinbotError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(FinbotError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_missing_api_key() {
        let had_key = std::env::var("OPENAI_API_KEY").ok();

        std::env::remove_var("OPENAI_API_KEY");
        let err = check(Operation::Search).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        std::env::set_var("OPENAI_API_KEY", "sk-test");
        assert!(check(Operation::Ask).is_ok());

        match had_key {
            Some(key) => std::env::set_var("OPENAI_API_KEY", key),
            None => std::env::remove_var("OPENAI_API_KEY"),
        }
    }
}
