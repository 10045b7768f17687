//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{MockProvider, OllamaProvider};
use legal_core::{AppError, AppResult};
use legal_llm::{with_retry, RetryPolicy};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(config.dimensions))),

        "ollama" => {
            let endpoint = config
                .endpoint
                .clone()
                .or_else(|| std::env::var("OLLAMA_HOST").ok());
            Ok(Arc::new(OllamaProvider::new(
                endpoint,
                &config.model,
                config.dimensions,
            )?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            config.provider
        ))),
    }
}

/// Applies query/passage prefixes and the backend deadline to a provider.
#[derive(Debug, Clone)]
pub struct PrefixedEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    query_prefix: String,
    passage_prefix: String,
    batch_size: usize,
    policy: RetryPolicy,
}

impl PrefixedEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        config: &EmbeddingConfig,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            query_prefix: config.query_prefix.clone(),
            passage_prefix: config.passage_prefix.clone(),
            batch_size: config.batch_size.max(1),
            policy,
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        let text = format!("{}{}", self.query_prefix, query);
        with_retry(self.policy, "embed_query", || self.provider.embed(&text)).await
    }

    /// Embed passages in batches; output order matches input order.
    pub async fn embed_passages(&self, passages: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(passages.len());

        for batch in passages.chunks(self.batch_size) {
            let prefixed: Vec<String> = batch
                .iter()
                .map(|p| format!("{}{}", self.passage_prefix, p))
                .collect();
            let embedded = with_retry(self.policy, "embed_passages", || {
                self.provider.embed_batch(&prefixed)
            })
            .await?;

            if embedded.len() != prefixed.len() {
                return Err(AppError::Embedding(format!(
                    "Provider returned {} vectors for {} passages",
                    embedded.len(),
                    prefixed.len()
                )));
            }
            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_create_mock_provider() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..EmbeddingConfig::default()
        };

        let result = create_provider(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_prefixes_change_the_vector() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config).unwrap();
        let embedder = PrefixedEmbedder::new(
            provider.clone(),
            &config,
            RetryPolicy::once(Duration::from_secs(5)),
        );

        let as_query = embedder.embed_query("мошенничество").await.unwrap();
        let as_passage = embedder
            .embed_passages(&["мошенничество".to_string()])
            .await
            .unwrap();
        let direct = provider.embed("query: мошенничество").await.unwrap();

        assert_eq!(as_query, direct);
        assert_ne!(as_query, as_passage[0]);
    }

    #[tokio::test]
    async fn test_embed_passages_batches_preserve_order() {
        let config = EmbeddingConfig {
            batch_size: 2,
            ..EmbeddingConfig::default()
        };
        let provider = create_provider(&config).unwrap();
        let embedder = PrefixedEmbedder::new(
            provider.clone(),
            &config,
            RetryPolicy::once(Duration::from_secs(5)),
        );

        let passages: Vec<String> = ["первый", "второй", "третий"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vectors = embedder.embed_passages(&passages).await.unwrap();

        assert_eq!(vectors.len(), 3);
        let third = provider.embed("passage: третий").await.unwrap();
        assert_eq!(vectors[2], third);
    }
}
