//! LexDesk CLI entry point.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lexdesk::cli::{Args, Commands};
use lexdesk::engine::AnswerEngine;
use lexdesk::feedback::FeedbackLog;
use lexdesk::scoring::ScoringStrategy;
use lexdesk::store::InMemoryDocumentStore;
use lexdesk::types::{Decision, KnowledgeEntry};
use lexdesk::EngineConfig;

/// Suggested answers are previews; full text comes from the entry lookup.
const ANSWER_PREVIEW_CHARS: usize = 500;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load()?,
    };
    if args.lexical_only {
        config.strategy = ScoringStrategy::Lexical;
    }

    let entries = load_corpus(&args)?;
    let store = Arc::new(InMemoryDocumentStore::seed(entries).await);

    let mut engine = AnswerEngine::with_default_encoder(store, config);
    if let Some(path) = &args.feedback_log {
        engine = engine.with_feedback_log(FeedbackLog::new(path));
    }
    let engine = Arc::new(engine);
    engine.rebuild_indices(true).await?;

    match args.command {
        Commands::Ask {
            question,
            category,
            session,
            json,
        } => {
            let decision = engine.answer_question(&question, category, session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            } else {
                render_decision(&decision);
            }
        }
        Commands::Rebuild => {
            let report = engine.rebuild_indices(true).await?;
            println!(
                "Rebuilt index: {} entries in {} ms",
                report.entries_indexed, report.build_duration_ms
            );
        }
        Commands::Status => {
            let status = engine.index_status().await;
            println!("Entries indexed:  {}", status.entries_indexed);
            println!(
                "Last build:       {}",
                status
                    .last_build_time
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string())
            );
            println!("Pending changes:  {}", status.staleness_count);
            println!(
                "Semantic index:   {}",
                if status.semantic_enabled {
                    "enabled"
                } else {
                    "disabled (lexical-only)"
                }
            );
        }
    }

    Ok(())
}

fn load_corpus(args: &Args) -> Result<Vec<KnowledgeEntry>> {
    let contents = fs::read_to_string(&args.corpus)
        .with_context(|| format!("Failed to read corpus file {}", args.corpus.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse corpus file {}", args.corpus.display()))
}

fn render_decision(decision: &lexdesk::types::AnswerDecision) {
    match &decision.decision {
        Decision::AutoAnswer { entry } => {
            println!("ANSWER (confidence {:.2})", decision.confidence);
            println!();
            println!("{}", truncate_chars(&entry.answer_text, ANSWER_PREVIEW_CHARS));
        }
        Decision::Suggest { entries } => {
            println!(
                "No confident match (confidence {:.2}). Did you mean:",
                decision.confidence
            );
            println!();
            for (i, entry) in entries.iter().enumerate() {
                println!("{}. {}", i + 1, entry.question_text);
                println!(
                    "   {}",
                    truncate_chars(&entry.answer_text, ANSWER_PREVIEW_CHARS)
                );
            }
        }
        Decision::Escalate => {
            println!("No suitable answer found; forwarding to a human agent.");
        }
    }
}

/// Truncate on a character boundary, never mid-codepoint.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_boundary() {
        assert_eq!(truncate_chars("合同纠纷", 10), "合同纠纷");
        assert_eq!(truncate_chars("合同纠纷处理", 4), "合同纠纷…");
    }
}
