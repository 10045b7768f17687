//! Eval command handler.
//!
//! Scores retrieval against a JSON file of labelled queries.

use super::{open_pipeline, print_json};
use clap::Args;
use legal_core::{config::AppConfig, AppError, AppResult};
use legal_knowledge::eval::{load_queries, run_eval, EvalReport};
use std::path::PathBuf;

/// Evaluate retrieval against labelled queries
#[derive(Args, Debug)]
pub struct EvalCommand {
    /// JSON array of {id, query, lang, relevant_articles}
    pub queries: PathBuf,

    /// Knowledge base to evaluate (default: configured base)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Also run the full pipeline and record the refusal rate
    #[arg(long)]
    pub answer: bool,

    /// Output the full report as JSON
    #[arg(long)]
    pub json: bool,
}

impl EvalCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing eval command on {:?}", self.queries);

        let queries = load_queries(&self.queries)?;
        if queries.is_empty() {
            return Err(AppError::Config(format!(
                "{:?} contains no usable queries",
                self.queries
            )));
        }

        let pipeline = open_pipeline(config, self.base.as_deref())?;
        let report = run_eval(&pipeline, &queries, self.answer).await;

        if self.json {
            return print_json(&report);
        }

        print_summary(&report);
        Ok(())
    }
}

fn print_summary(report: &EvalReport) {
    for row in &report.rows {
        let retrieved = row.retrieved_articles.iter().take(5).cloned().collect::<Vec<_>>();
        match &row.error {
            Some(error) => println!("{:<10} error: {}", row.id, error),
            None => println!(
                "{:<10} relevant={:?} top5={:?} mrr={}",
                row.id,
                row.relevant_articles,
                retrieved,
                format_metric(row.metrics.mrr)
            ),
        }
    }

    println!();
    println!("Queries: {}", report.total_queries);
    if report.avg_mrr.is_none() {
        println!("Retrieval metrics skipped: no query lists relevant_articles.");
    } else {
        println!("Average Precision@5: {}", format_metric(report.avg_precision_at_5));
        println!("Average Recall@10:   {}", format_metric(report.avg_recall_at_10));
        println!("Average MRR:         {}", format_metric(report.avg_mrr));
        println!("Average HitRate@5:   {}", format_metric(report.avg_hit_rate_at_5));
    }
    if let Some(refusal) = report.avg_refusal_rate {
        println!("Average Refusal Rate: {:.3}", refusal);
    }
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
}
