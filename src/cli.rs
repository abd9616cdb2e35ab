//! Command-line argument parsing for LexDesk
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// LexDesk - hybrid retrieval and answer ranking for legal Q&A
#[derive(Parser, Debug)]
#[command(name = "lexdesk")]
#[command(version = "0.3.0")]
#[command(about = "Answer, suggest, or escalate customer legal questions", long_about = None)]
pub struct Args {
    /// Knowledge corpus file (JSON array of entries)
    #[arg(short = 'k', long, value_name = "FILE")]
    pub corpus: PathBuf,

    /// Configuration file path (defaults to ~/.lexdesk/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Feedback log path (JSONL, appended per accepted/rejected answer)
    #[arg(long)]
    pub feedback_log: Option<PathBuf>,

    /// Disable the semantic encoder; rank with TF-IDF only
    #[arg(long)]
    pub lexical_only: bool,

    /// Verbosity level: default (warn), -v (info), -vv (debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a single question and print the decision
    Ask {
        /// The question text
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Restrict candidates to one legal category
        #[arg(long)]
        category: Option<String>,

        /// Session identifier for logging and feedback correlation
        #[arg(long)]
        session: Option<String>,

        /// Print the full decision as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the lexical and semantic indices from the corpus
    Rebuild,

    /// Show index status (entry count, staleness, semantic availability)
    Status,
}

impl Args {
    /// Log filter directive derived from the -v count
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "lexdesk=warn",
            1 => "lexdesk=info",
            _ => "lexdesk=debug",
        }
    }
}
