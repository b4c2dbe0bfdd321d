//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingestion::Ingestor;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(dir: &str, force: bool, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let ingestor = Ingestor::new(&settings)?.with_force(force);

    let spinner = Output::spinner(&format!("Ingesting documents from {}...", dir));
    let report = ingestor.ingest_dir(dir).await;
    spinner.finish_and_clear();

    match report {
        Ok(report) => {
            Output::success(&format!(
                "Ingestion complete: {} added, {} skipped, {} failed",
                report.added, report.skipped, report.failed
            ));

            if !report.failures.is_empty() {
                Output::header("Failures");
                for (source_id, reason) in &report.failures {
                    Output::warning(&format!("{}: {}", source_id, reason));
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
