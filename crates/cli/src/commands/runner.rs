//! Runner command handler.
//!
//! Reads one `{"prompt": "..."}` request from stdin and prints exactly one
//! JSON response line. Failures are reported in the response, never as a
//! non-zero exit.

use super::open_pipeline;
use clap::Args;
use legal_core::{config::AppConfig, AppResult};
use legal_knowledge::ServiceResponse;
use tokio::io::AsyncReadExt;

/// Answer one JSON request from stdin
#[derive(Args, Debug)]
pub struct RunnerCommand {
    /// Knowledge base to answer from (default: configured base)
    #[arg(short, long)]
    pub base: Option<String>,
}

impl RunnerCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing runner command");

        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;

        let response = match parse_request(&input) {
            Ok(prompt) => match open_pipeline(config, self.base.as_deref()) {
                Ok(pipeline) => pipeline.respond(&prompt).await,
                Err(e) => {
                    tracing::error!("Failed to open knowledge base: {}", e);
                    e.into()
                }
            },
            Err(response) => response,
        };

        println!("{}", serde_json::to_string(&response)?);
        Ok(())
    }
}

/// Extract the prompt from a runner request.
fn parse_request(input: &str) -> Result<String, ServiceResponse> {
    if input.trim().is_empty() {
        return Err(ServiceResponse::error("missing_input", None));
    }

    let request: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| ServiceResponse::error("invalid_json", Some(e.to_string())))?;

    request
        .get("prompt")
        .and_then(|p| p.as_str())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceResponse::error("missing_prompt", None))
}
