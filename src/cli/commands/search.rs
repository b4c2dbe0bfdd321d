//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::create_embedder;
use crate::retrieval::Retriever;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    limit: usize,
    min_score: f32,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let retriever = Retriever::new(&settings, create_embedder(&settings), open_store(&settings)?);

    let spinner = Output::spinner("Searching...");
    let results = retriever.retrieve_with(query, limit, min_score).await;
    spinner.finish_and_clear();

    match results {
        Ok(result) => {
            if result.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", result.chunks.len()));

                for chunk in &result.chunks {
                    Output::search_result(
                        &chunk.source_id,
                        chunk.chunk_index,
                        chunk.score,
                        &chunk.content,
                    );
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
