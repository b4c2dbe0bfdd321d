//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    match store.list_sources().await {
        Ok(sources) => {
            if sources.is_empty() {
                Output::info("No documents indexed yet. Use 'finbot ingest <dir>' to add some.");
            } else {
                Output::header(&format!("Indexed Documents ({})", sources.len()));
                println!();

                for source in &sources {
                    Output::source_info(
                        &source.source_id,
                        source.chunk_count,
                        &source.indexed_at.format("%Y-%m-%d %H:%M").to_string(),
                    );
                }

                let total_chunks: u32 = sources.iter().map(|s| s.chunk_count).sum();
                println!();
                Output::kv("Total documents", &sources.len().to_string());
                Output::kv("Total chunks", &total_chunks.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list documents: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
