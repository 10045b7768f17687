//! Retrieval evaluation against labelled queries.
//!
//! Queries come from a JSON array of `{id, query, lang, relevant_articles}`.
//! Article labels on both sides are reduced to their first run of digits
//! before comparison, so "ст. 190" and "190-1" both count as article 190.

use crate::rag::pipeline::AnswerPipeline;
use crate::rag::router::route;
use legal_core::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

static ARTICLE_DIGITS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d{1,4}").ok());

/// One labelled evaluation query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalQuery {
    #[serde(default)]
    pub id: String,
    pub query: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(
        default,
        alias = "relevant_article_numbers",
        alias = "ground_truth_articles"
    )]
    pub relevant_articles: Vec<String>,
}

fn default_lang() -> String {
    "ru".to_string()
}

/// Ranking metrics for a single query. `None` when the query has no
/// relevant articles to score against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    #[serde(rename = "precision@5")]
    pub precision_at_5: Option<f64>,
    #[serde(rename = "recall@10")]
    pub recall_at_10: Option<f64>,
    pub mrr: Option<f64>,
    #[serde(rename = "hit_rate@5")]
    pub hit_rate_at_5: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRow {
    pub id: String,
    pub query: String,
    pub lang: String,
    pub relevant_articles: Vec<String>,
    pub retrieved_articles: Vec<String>,
    #[serde(flatten)]
    pub metrics: RetrievalMetrics,
    /// 1.0 when the full pipeline refused, 0.0 when it answered; absent
    /// unless answers were requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub total_queries: usize,
    #[serde(rename = "avg_precision@5")]
    pub avg_precision_at_5: Option<f64>,
    #[serde(rename = "avg_recall@10")]
    pub avg_recall_at_10: Option<f64>,
    pub avg_mrr: Option<f64>,
    #[serde(rename = "avg_hit_rate@5")]
    pub avg_hit_rate_at_5: Option<f64>,
    pub avg_refusal_rate: Option<f64>,
    pub rows: Vec<EvalRow>,
}

impl EvalReport {
    pub fn from_rows(rows: Vec<EvalRow>) -> Self {
        Self {
            total_queries: rows.len(),
            avg_precision_at_5: average(rows.iter().map(|r| r.metrics.precision_at_5)),
            avg_recall_at_10: average(rows.iter().map(|r| r.metrics.recall_at_10)),
            avg_mrr: average(rows.iter().map(|r| r.metrics.mrr)),
            avg_hit_rate_at_5: average(rows.iter().map(|r| r.metrics.hit_rate_at_5)),
            avg_refusal_rate: average(rows.iter().map(|r| r.refusal_rate)),
            rows,
        }
    }
}

/// Reduce an article label to its first 1-4 digit run, or its lowercase
/// text when it has no digits. Empty input stays empty.
pub fn normalize_article(value: &str) -> String {
    let text = value.trim();
    if text.is_empty() {
        return String::new();
    }
    ARTICLE_DIGITS
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| text.to_lowercase())
}

pub fn compute_metrics(retrieved: &[String], relevant: &[String]) -> RetrievalMetrics {
    let relevant: HashSet<String> = relevant
        .iter()
        .map(|a| normalize_article(a))
        .filter(|a| !a.is_empty())
        .collect();
    if relevant.is_empty() {
        return RetrievalMetrics::default();
    }

    let ranked: Vec<String> = retrieved
        .iter()
        .map(|a| normalize_article(a))
        .filter(|a| !a.is_empty())
        .collect();

    let top5: HashSet<&String> = ranked.iter().take(5).collect();
    let top10: HashSet<&String> = ranked.iter().take(10).collect();
    let tp5 = top5.iter().filter(|a| relevant.contains(**a)).count();
    let tp10 = top10.iter().filter(|a| relevant.contains(**a)).count();

    let precision = if top5.is_empty() {
        0.0
    } else {
        tp5 as f64 / top5.len() as f64
    };
    let reciprocal_rank = ranked
        .iter()
        .position(|a| relevant.contains(a))
        .map_or(0.0, |idx| 1.0 / (idx + 1) as f64);

    RetrievalMetrics {
        precision_at_5: Some(precision),
        recall_at_10: Some(tp10 as f64 / relevant.len() as f64),
        mrr: Some(reciprocal_rank),
        hit_rate_at_5: Some(if tp5 > 0 { 1.0 } else { 0.0 }),
    }
}

/// Load labelled queries; entries with an empty query are dropped and
/// missing ids are numbered `q_001`, `q_002`, ...
pub fn load_queries(path: &Path) -> AppResult<Vec<EvalQuery>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
    let parsed: Vec<EvalQuery> = serde_json::from_str(&content)?;

    let queries: Vec<EvalQuery> = parsed
        .into_iter()
        .enumerate()
        .filter(|(_, q)| !q.query.trim().is_empty())
        .map(|(i, mut q)| {
            if q.id.is_empty() {
                q.id = format!("q_{:03}", i + 1);
            }
            q.query = q.query.trim().to_string();
            q.relevant_articles = q
                .relevant_articles
                .iter()
                .map(|a| normalize_article(a))
                .filter(|a| !a.is_empty())
                .collect();
            q
        })
        .collect();

    tracing::info!("Loaded {} evaluation queries from {:?}", queries.len(), path);
    Ok(queries)
}

/// Score retrieval for every query; with `with_answers`, also run the full
/// pipeline and record whether it refused.
///
/// A query whose retrieval fails is recorded with its error and no metrics.
pub async fn run_eval(
    pipeline: &AnswerPipeline,
    queries: &[EvalQuery],
    with_answers: bool,
) -> EvalReport {
    let mut rows = Vec::with_capacity(queries.len());

    for query in queries {
        let ctx = route(&query.query);
        let (retrieved_articles, error) = match pipeline.retrieve(&ctx).await {
            Ok(candidates) => (
                candidates
                    .iter()
                    .filter_map(|c| c.chunk.article_number.as_deref())
                    .map(normalize_article)
                    .filter(|a| !a.is_empty())
                    .collect(),
                None,
            ),
            Err(e) => {
                tracing::warn!(id = %query.id, error = %e, "Retrieval failed during evaluation");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let metrics = if error.is_some() {
            RetrievalMetrics::default()
        } else {
            compute_metrics(&retrieved_articles, &query.relevant_articles)
        };

        let refusal_rate = if with_answers {
            match pipeline.answer(&query.query).await {
                Ok(response) => Some(if response.is_fallback() { 1.0 } else { 0.0 }),
                Err(e) => {
                    tracing::warn!(id = %query.id, error = %e, "Answer failed during evaluation");
                    None
                }
            }
        } else {
            None
        };

        tracing::debug!(id = %query.id, metrics = ?metrics, "Evaluated query");

        rows.push(EvalRow {
            id: query.id.clone(),
            query: query.query.clone(),
            lang: query.lang.clone(),
            relevant_articles: query.relevant_articles.clone(),
            retrieved_articles,
            metrics,
            refusal_rate,
            error,
        });
    }

    EvalReport::from_rows(rows)
}

fn average(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_normalize_article() {
        assert_eq!(normalize_article("ст. 190"), "190");
        assert_eq!(normalize_article("25-1"), "25");
        assert_eq!(normalize_article(" Преамбула "), "преамбула");
        assert_eq!(normalize_article("  "), "");
    }

    #[test]
    fn test_metrics_first_hit_at_rank_two() {
        let retrieved = labels(&["53", "190", "190", "218", "7", "12"]);
        let metrics = compute_metrics(&retrieved, &labels(&["190", "218"]));

        // top-5 distinct labels: 53, 190, 218, 7
        assert_eq!(metrics.precision_at_5, Some(0.5));
        assert_eq!(metrics.recall_at_10, Some(1.0));
        assert_eq!(metrics.mrr, Some(0.5));
        assert_eq!(metrics.hit_rate_at_5, Some(1.0));
    }

    #[test]
    fn test_metrics_miss() {
        let metrics = compute_metrics(&labels(&["1", "2"]), &labels(&["217"]));
        assert_eq!(metrics.precision_at_5, Some(0.0));
        assert_eq!(metrics.mrr, Some(0.0));
        assert_eq!(metrics.hit_rate_at_5, Some(0.0));
    }

    #[test]
    fn test_unlabelled_query_has_no_metrics() {
        let metrics = compute_metrics(&labels(&["1"]), &[]);
        assert_eq!(metrics, RetrievalMetrics::default());
    }

    #[test]
    fn test_average_skips_missing() {
        assert_eq!(average([Some(1.0), None, Some(0.0)].into_iter()), Some(0.5));
        assert_eq!(average([None, None].into_iter()), None);
    }

    #[test]
    fn test_load_queries_aliases_and_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("queries.json");
        std::fs::write(
            &path,
            r#"[
                {"query": "Мошенничество с субсидиями", "ground_truth_articles": ["ст. 190", "218"]},
                {"id": "kz_1", "query": "Қаржы пирамидасы", "lang": "kz", "relevant_article_numbers": ["217"]},
                {"query": "   "}
            ]"#,
        )
        .unwrap();

        let queries = load_queries(&path).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].id, "q_001");
        assert_eq!(queries[0].lang, "ru");
        assert_eq!(queries[0].relevant_articles, labels(&["190", "218"]));
        assert_eq!(queries[1].id, "kz_1");
        assert_eq!(queries[1].relevant_articles, labels(&["217"]));
    }
}
