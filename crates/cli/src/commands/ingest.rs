//! Ingest command handler.
//!
//! Builds a knowledge base offline from a directory of statute `.txt` files.

use super::print_json;
use clap::Args;
use legal_core::{config::AppConfig, AppResult};
use legal_knowledge::IngestOptions;
use std::path::PathBuf;

/// Build a knowledge base from statute text files
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory holding the statute `.txt` files (one file per code)
    #[arg(short, long)]
    pub docs: PathBuf,

    /// Knowledge base name (default: configured base)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Remove the existing build before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base = self
            .base
            .clone()
            .unwrap_or_else(|| config.knowledge_base.clone());
        tracing::info!("Executing ingest command for base '{}'", base);

        let docs = if self.docs.is_absolute() {
            self.docs.clone()
        } else {
            config.workspace.join(&self.docs)
        };

        let options = IngestOptions {
            base_name: base.clone(),
            documents_dir: docs,
            reset: self.reset,
        };

        let stats = legal_knowledge::ingest(&config.workspace, options).await?;

        if self.json {
            return print_json(&serde_json::json!({
                "base": base,
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "articleChunksCount": stats.article_chunks_count,
                "referenceEdges": stats.reference_edges,
                "skipped": stats.skipped,
                "bytesProcessed": stats.bytes_processed,
                "durationSecs": stats.duration_secs,
            }));
        }

        println!(
            "Ingested {} documents ({} chunks, {} with an article number, {} bytes) in {:.2}s",
            stats.documents_count,
            stats.chunks_count,
            stats.article_chunks_count,
            stats.bytes_processed,
            stats.duration_secs
        );
        println!("Article references: {}", stats.reference_edges);
        for path in &stats.skipped {
            println!("Skipped: {}", path);
        }

        Ok(())
    }
}
