//! legal-rag CLI
//!
//! Main entry point for the legal-rag command-line tool.
//! Builds statute knowledge bases and answers questions grounded in them.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, CleanCommand, EvalCommand, IngestCommand, RunnerCommand, StatsCommand};
use legal_core::{config::AppConfig, logging};
use std::path::PathBuf;
use tracing::Instrument;

/// Grounded question answering over Kazakhstan statutes (RU/KZ)
#[derive(Parser, Debug)]
#[command(name = "legal-rag")]
#[command(about = "Grounded question answering over Kazakhstan statutes", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEGAL_RAG_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEGAL_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// Generation provider (ollama, mock)
    #[arg(short, long, global = true, env = "LEGAL_RAG_PROVIDER")]
    provider: Option<String>,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "LEGAL_RAG_LLM")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a knowledge base from statute text files
    Ingest(IngestCommand),

    /// Answer a legal question
    Ask(AskCommand),

    /// Answer one JSON request from stdin
    Runner(RunnerCommand),

    /// Evaluate retrieval against labelled queries
    Eval(EvalCommand),

    /// Show knowledge base statistics
    Stats(StatsCommand),

    /// Remove a knowledge base's built artifacts
    Clean(CleanCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest(_) => "ingest",
            Commands::Ask(_) => "ask",
            Commands::Runner(_) => "runner",
            Commands::Eval(_) => "eval",
            Commands::Stats(_) => "stats",
            Commands::Clean(_) => "clean",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from defaults, config.yaml and environment
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)
        .context("Failed to initialize logging")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("legal-rag starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config
        .ensure_state_dir()
        .context("Failed to prepare the workspace state directory")?;

    let command = cli.command;
    let span = tracing::info_span!("command", name = command.name());
    let result = async move {
        match command {
            Commands::Ingest(cmd) => cmd.execute(&config).await,
            Commands::Ask(cmd) => cmd.execute(&config).await,
            Commands::Runner(cmd) => cmd.execute(&config).await,
            Commands::Eval(cmd) => cmd.execute(&config).await,
            Commands::Stats(cmd) => cmd.execute(&config),
            Commands::Clean(cmd) => cmd.execute(&config),
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!(kind = e.kind(), "Command failed: {}", e),
    }

    Ok(result?)
}
