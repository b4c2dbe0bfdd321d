//! Remove command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::open_store;
use anyhow::Result;

/// Run the remove command.
pub async fn run_remove(source: &str, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;

    match store.delete_by_source(source).await {
        Ok(0) => {
            Output::warning(&format!("No indexed entries found for '{}'.", source));
            Output::info("Use 'finbot list' to see indexed documents.");
        }
        Ok(deleted) => {
            Output::success(&format!("Removed {} entries for '{}'.", deleted, source));
        }
        Err(e) => {
            Output::error(&format!("Failed to remove '{}': {}", source, e));
            return Err(e.into());
        }
    }

    Ok(())
}
