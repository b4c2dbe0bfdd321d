//! CLI module for FinBot.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// FinBot - Grounded Canadian Finance Q&A
///
/// A local-first CLI assistant that answers Canadian-finance questions from
/// an indexed corpus of government documents, with citations.
#[derive(Parser, Debug)]
#[command(name = "finbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize FinBot and verify configuration
    Init,

    /// Ingest documents from a directory into the index
    Ingest {
        /// Directory containing documents (pdf, html, txt, md)
        dir: String,

        /// Re-ingest documents even if their content is unchanged
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question and get a cited answer from the indexed documents
    Ask {
        /// The question to ask
        question: String,

        /// LLM model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,

        /// Number of context chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive question-answering session
    Chat {
        /// LLM model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Search the index without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (0.0-1.0)
        #[arg(short, long, default_value = "0.25")]
        min_score: f32,
    },

    /// List indexed documents
    List,

    /// Remove a document's entries from the index
    Remove {
        /// Source identity to remove (as shown by 'finbot list')
        source: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
