//! Ask command handler.
//!
//! Answers one question from a built knowledge base.

use super::{open_pipeline, print_json};
use clap::Args;
use legal_core::{config::AppConfig, AppError, AppResult};
use std::path::PathBuf;

/// Answer a legal question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: Option<String>,

    /// Read the question from a file
    #[arg(short, long, conflicts_with = "query")]
    pub file: Option<PathBuf>,

    /// Knowledge base to answer from (default: configured base)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let query = self.get_query()?;
        let pipeline = open_pipeline(config, self.base.as_deref())?;

        let response = pipeline.answer(&query).await?;

        if self.json {
            return print_json(&response);
        }

        println!("{}", response.text);
        println!();

        if response.sources.is_empty() {
            tracing::debug!(reason = ?response.fallback_reason, "Answer has no sources");
        } else {
            println!("Sources:");
            for source in &response.sources {
                match &source.article_number {
                    Some(article) => println!("- {}, {} ({})", source.code_name, article, source.document),
                    None => println!("- {} ({})", source.code_name, source.document),
                }
            }
            println!();
        }

        println!("{}", response.disclaimer);
        Ok(())
    }

    fn get_query(&self) -> AppResult<String> {
        let query = match (&self.query, &self.file) {
            (Some(query), _) => query.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read question file {:?}: {}", path, e))
            })?,
            (None, None) => return Err(AppError::Config("No question provided".to_string())),
        };

        let query = query.trim().to_string();
        if query.is_empty() {
            return Err(AppError::Config("Question is empty".to_string()));
        }
        Ok(query)
    }
}
