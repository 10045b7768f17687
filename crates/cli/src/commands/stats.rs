//! Stats and clean command handlers.

use super::print_json;
use clap::Args;
use legal_core::{config::AppConfig, AppResult};

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Knowledge base name (default: configured base)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base = self.base.as_deref().unwrap_or(&config.knowledge_base);
        tracing::info!("Executing stats command for base '{}'", base);

        let stats = legal_knowledge::stats(&config.workspace, base)?;

        if self.json {
            return print_json(&stats);
        }

        println!("Knowledge base: {}", stats.base_name);
        println!("  Corpus chunks: {}", stats.corpus_chunks);
        println!("  Dense vectors: {}", stats.dense_rows);
        println!("  Reference graph nodes: {}", stats.reference_nodes);
        println!("  Dense index size: {} bytes", stats.db_size_bytes);
        if let Some(last) = &stats.last_ingest {
            println!(
                "  Last ingest: {} ({} documents, {} skipped)",
                last.ingested_at.to_rfc3339(),
                last.documents_count,
                last.skipped.len()
            );
        }

        Ok(())
    }
}

/// Remove a knowledge base's built artifacts
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Knowledge base name (default: configured base)
    #[arg(short, long)]
    pub base: Option<String>,
}

impl CleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base = self.base.as_deref().unwrap_or(&config.knowledge_base);
        legal_knowledge::clean(&config.workspace, base)?;

        println!("Knowledge base '{}' cleaned", base);
        Ok(())
    }
}
