//! Embedding configuration types.

use legal_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Prepended to every query before embedding
    #[serde(default = "default_query_prefix")]
    pub query_prefix: String,

    /// Prepended to every passage before embedding
    #[serde(default = "default_passage_prefix")]
    pub passage_prefix: String,

    /// Provider endpoint; Ollama falls back to OLLAMA_HOST
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_query_prefix() -> String {
    "query: ".to_string()
}

fn default_passage_prefix() -> String {
    "passage: ".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            query_prefix: default_query_prefix(),
            passage_prefix: default_passage_prefix(),
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Settings for a multilingual-e5-large deployment served by Ollama.
    pub fn ollama_e5() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "intfloat/multilingual-e5-large".to_string(),
            dimensions: 1024,
            ..Self::default()
        }
    }

    /// Validate that an index built with `other` can be queried with this config.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.model != other.model {
            return Err(AppError::Index(format!(
                "Model mismatch: index built with '{}', configured '{}'",
                other.model, self.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::Index(format!(
                "Dimension mismatch: index has {}, configured {}",
                other.dimensions, self.dimensions
            )));
        }

        Ok(())
    }
}
