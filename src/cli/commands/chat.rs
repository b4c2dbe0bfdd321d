//! Interactive question-answering session.
//!
//! Each turn runs the full ask path: retrieval is grounded per question,
//! so the session never carries stale context between turns.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagEngine;
use anyhow::Result;
use console::style;
use futures::StreamExt;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let engine = RagEngine::from_settings(&settings, model.as_deref())?;

    println!("\n{}", style("FinBot").bold().cyan());
    println!(
        "{} ({})\n",
        style("Ask about your indexed documents, or 'exit' to quit.").dim(),
        style(engine.backend_model()).dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        match engine.ask_stream(input).await {
            Ok(mut response) => {
                print!("\n{} ", style("FinBot:").cyan().bold());
                stdout.flush()?;

                while let Some(fragment) = response.stream.next().await {
                    match fragment {
                        Ok(text) => {
                            print!("{}", text);
                            stdout.flush()?;
                        }
                        Err(e) => {
                            println!();
                            Output::error(&format!("Stream error: {}", e));
                            break;
                        }
                    }
                }
                println!();

                if !response.sources.is_empty() {
                    println!(
                        "{} {}",
                        style("Sources:").dim(),
                        style(response.sources.join(", ")).dim()
                    );
                }
                println!();
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
