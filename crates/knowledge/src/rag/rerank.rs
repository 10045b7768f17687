//! Second-pass relevance scoring over the filtered candidates.
//!
//! Scoring goes through the [`CrossEncoder`] trait. Any scoring failure
//! (backend down, deadline hit, malformed reply) keeps the upstream order.

use crate::lexical::tokenize;
use crate::rag::types::Candidate;
use crate::types::RerankConfig;
use async_trait::async_trait;
use legal_core::{AppError, AppResult};
use legal_llm::{with_retry, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Scores (query, passage) pairs; higher is more relevant.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    fn name(&self) -> &str;

    /// One score per passage, in input order.
    async fn score(&self, query: &str, passages: &[String]) -> AppResult<Vec<f32>>;
}

/// In-process scorer: share of query terms found in the passage.
#[derive(Debug, Default)]
pub struct OverlapScorer;

#[async_trait]
impl CrossEncoder for OverlapScorer {
    fn name(&self) -> &str {
        "overlap"
    }

    async fn score(&self, query: &str, passages: &[String]) -> AppResult<Vec<f32>> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        if terms.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }

        Ok(passages
            .iter()
            .map(|passage| {
                let found: HashSet<String> = tokenize(passage).into_iter().collect();
                terms.intersection(&found).count() as f32 / terms.len() as f32
            })
            .collect())
    }
}

/// Cross-encoder served over HTTP (`POST {endpoint}/rerank`).
#[derive(Debug, Clone)]
pub struct HttpCrossEncoder {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl HttpCrossEncoder {
    pub fn new(endpoint: &str) -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Rerank(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    fn name(&self) -> &str {
        "http"
    }

    async fn score(&self, query: &str, passages: &[String]) -> AppResult<Vec<f32>> {
        let url = format!("{}/rerank", self.endpoint);

        let response = self
            .client
            .post(&url)
            .json(&RerankRequest {
                query,
                texts: passages,
            })
            .send()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to reach reranker: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Rerank(format!("Reranker error ({}): {}", status, body)));
        }

        let hits: Vec<RerankHit> = response
            .json()
            .await
            .map_err(|e| AppError::Rerank(format!("Failed to parse reranker response: {}", e)))?;

        let mut scores = vec![f32::NEG_INFINITY; passages.len()];
        for hit in hits {
            let slot = scores.get_mut(hit.index).ok_or_else(|| {
                AppError::Rerank(format!("Reranker returned unknown index {}", hit.index))
            })?;
            *slot = hit.score;
        }
        Ok(scores)
    }
}

/// Build the scorer named in the config, or `None` when reranking is off.
pub fn create_cross_encoder(config: &RerankConfig) -> AppResult<Option<Arc<dyn CrossEncoder>>> {
    if !config.enabled {
        return Ok(None);
    }

    match config.provider.as_str() {
        "overlap" => Ok(Some(Arc::new(OverlapScorer))),
        "http" => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                AppError::Config("rerank.endpoint is required for the http reranker".to_string())
            })?;
            Ok(Some(Arc::new(HttpCrossEncoder::new(endpoint)?)))
        }
        other => Err(AppError::Config(format!(
            "Unknown rerank provider: '{}'. Supported providers: overlap, http",
            other
        ))),
    }
}

pub struct Reranker {
    encoder: Option<Arc<dyn CrossEncoder>>,
    top_n: usize,
    policy: RetryPolicy,
}

impl Reranker {
    pub fn new(encoder: Option<Arc<dyn CrossEncoder>>, top_n: usize, policy: RetryPolicy) -> Self {
        Self {
            encoder,
            top_n: top_n.max(1),
            policy,
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Re-score and keep the best `top_n`. Never fails.
    pub async fn rerank(&self, query: &str, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        let Some(encoder) = &self.encoder else {
            candidates.truncate(self.top_n);
            return candidates;
        };
        if candidates.is_empty() {
            return candidates;
        }

        let passages: Vec<String> = candidates.iter().map(|c| c.chunk.text.clone()).collect();
        let scored = with_retry(self.policy, "rerank", || encoder.score(query, &passages)).await;

        match scored {
            Ok(scores) if scores.len() == candidates.len() => {
                for (candidate, score) in candidates.iter_mut().zip(scores) {
                    candidate.rerank_score = Some(score);
                }
                // stable: equal scores keep the fused order
                candidates.sort_by(|a, b| {
                    b.rerank_score
                        .partial_cmp(&a.rerank_score)
                        .unwrap_or(Ordering::Equal)
                });
                tracing::debug!(encoder = encoder.name(), kept = self.top_n, "Reranked candidates");
            }
            Ok(scores) => {
                tracing::warn!(
                    expected = candidates.len(),
                    got = scores.len(),
                    "Reranker returned the wrong number of scores, keeping fused order"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reranker unavailable, keeping fused order");
            }
        }

        candidates.truncate(self.top_n);
        candidates
    }
}
