//! Command handlers for the legal-rag CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod eval;
pub mod ingest;
pub mod runner;
pub mod stats;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use eval::EvalCommand;
pub use ingest::IngestCommand;
pub use runner::RunnerCommand;
pub use stats::{CleanCommand, StatsCommand};

use legal_core::{config::AppConfig, AppResult};
use legal_knowledge::AnswerPipeline;

/// Open the answer pipeline for `base`, or the configured default base.
pub(crate) fn open_pipeline(config: &AppConfig, base: Option<&str>) -> AppResult<AnswerPipeline> {
    let base = base.unwrap_or(&config.knowledge_base);
    tracing::debug!("Opening knowledge base '{}'", base);
    AnswerPipeline::open(&config.workspace, config, base)
}

/// Pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
