//! Error types for the legal RAG workspace.
//!
//! A single enum covers every failure category: configuration, I/O,
//! the three model backends (generation, embedding, reranking), the
//! indices, ingestion and prompts.

use thiserror::Error;

/// Unified error type.
///
/// All library functions return `Result<T, AppError>`.
/// Errors are propagated to the caller, never turned into panics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text-generation backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding backend errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Dense or lexical index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Cross-encoder backend errors
    #[error("Rerank error: {0}")]
    Rerank(String),

    /// Document ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A backend call exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether a single retry of the failed call is worthwhile.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Timeout(_) | AppError::Llm(_) | AppError::Embedding(_) | AppError::Rerank(_)
        )
    }

    /// Stable label used in structured error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::Io(_) => "io_error",
            AppError::Llm(_) => "generation_error",
            AppError::Embedding(_) => "embedding_error",
            AppError::Index(_) => "index_error",
            AppError::Rerank(_) => "rerank_error",
            AppError::Ingest(_) => "ingest_error",
            AppError::Prompt(_) => "prompt_error",
            AppError::Serialization(_) => "serialization_error",
            AppError::Timeout(_) => "timeout",
            AppError::Other(_) => "rag_exception",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
