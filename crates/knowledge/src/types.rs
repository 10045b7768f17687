//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use chrono::{DateTime, Utc};
use legal_core::{AppError, AppResult};
use legal_llm::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    pub name: String,

    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    #[serde(default)]
    pub segmentation: SegmentationConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub filtering: FilterConfig,

    #[serde(default)]
    pub rerank: RerankConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

impl KnowledgeBaseConfig {
    /// Reject weight and size settings outside their supported ranges.
    pub fn validate(&self) -> AppResult<()> {
        let r = &self.retrieval;
        if !(0.3..=0.6).contains(&r.lexical_weight) {
            return Err(AppError::Config(format!(
                "retrieval.lexical_weight must be within 0.3..=0.6, got {}",
                r.lexical_weight
            )));
        }
        if !(0.4..=0.7).contains(&r.dense_weight) {
            return Err(AppError::Config(format!(
                "retrieval.dense_weight must be within 0.4..=0.7, got {}",
                r.dense_weight
            )));
        }
        if r.hybrid_k == 0 {
            return Err(AppError::Config("retrieval.hybrid_k must be positive".to_string()));
        }

        let s = &self.segmentation;
        if !(s.whole_article_max <= s.medium_split_threshold
            && s.medium_split_threshold <= s.medium_article_max)
        {
            return Err(AppError::Config(format!(
                "segmentation limits must satisfy whole ({}) <= split threshold ({}) <= medium ({})",
                s.whole_article_max, s.medium_split_threshold, s.medium_article_max
            )));
        }

        if self.context.max_chunks == 0 || self.context.max_chunk_chars == 0 {
            return Err(AppError::Config(
                "context limits must be positive".to_string(),
            ));
        }

        if self.embeddings.dimensions == 0 {
            return Err(AppError::Config(
                "embeddings.dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Size tiers and overlap for the statute segmenter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    #[serde(default = "default_whole_article_max")]
    pub whole_article_max: usize,

    #[serde(default = "default_medium_article_max")]
    pub medium_article_max: usize,

    /// Medium articles longer than this are split into clauses.
    #[serde(default = "default_medium_split_threshold")]
    pub medium_split_threshold: usize,

    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,

    #[serde(default = "default_preamble_max")]
    pub preamble_max_chars: usize,
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_whole_article_max() -> usize {
    1000
}

fn default_medium_article_max() -> usize {
    2500
}

fn default_medium_split_threshold() -> usize {
    1500
}

fn default_overlap_chars() -> usize {
    175
}

fn default_preamble_max() -> usize {
    2500
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: default_min_chunk_chars(),
            whole_article_max: default_whole_article_max(),
            medium_article_max: default_medium_article_max(),
            medium_split_threshold: default_medium_split_threshold(),
            overlap_chars: default_overlap_chars(),
            preamble_max_chars: default_preamble_max(),
        }
    }
}

/// How dense and lexical rankings are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMethod {
    /// Weighted sum of min-max normalized scores.
    Weighted,
    /// Reciprocal-rank fusion.
    Rrf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates requested from each retriever.
    #[serde(default = "default_hybrid_k")]
    pub hybrid_k: usize,

    #[serde(default = "default_fusion")]
    pub fusion: FusionMethod,

    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    #[serde(default = "default_dense_weight")]
    pub dense_weight: f32,

    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Characters of chunk text used in the dedupe identity.
    #[serde(default = "default_dedupe_prefix")]
    pub dedupe_prefix_chars: usize,
}

fn default_hybrid_k() -> usize {
    12
}

fn default_fusion() -> FusionMethod {
    FusionMethod::Weighted
}

fn default_lexical_weight() -> f32 {
    0.6
}

fn default_dense_weight() -> f32 {
    0.4
}

fn default_rrf_k() -> f32 {
    60.0
}

fn default_dedupe_prefix() -> usize {
    200
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            hybrid_k: default_hybrid_k(),
            fusion: default_fusion(),
            lexical_weight: default_lexical_weight(),
            dense_weight: default_dense_weight(),
            rrf_k: default_rrf_k(),
            dedupe_prefix_chars: default_dedupe_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Criminal-code candidates to reach before supplementary lookups stop.
    #[serde(default = "default_criminal_min")]
    pub criminal_min_candidates: usize,

    /// Size of the unfiltered fallback when filtering leaves nothing.
    #[serde(default = "default_unfiltered_fallback")]
    pub unfiltered_fallback: usize,

    /// k for each supplementary lookup.
    #[serde(default = "default_supplementary_k")]
    pub supplementary_k: usize,

    /// Top candidates whose cited articles are pulled in (0 = off).
    #[serde(default = "default_reference_seeds")]
    pub reference_seeds: usize,

    /// Cited articles looked up per question.
    #[serde(default = "default_reference_limit")]
    pub reference_limit: usize,
}

fn default_criminal_min() -> usize {
    3
}

fn default_unfiltered_fallback() -> usize {
    5
}

fn default_supplementary_k() -> usize {
    6
}

fn default_reference_seeds() -> usize {
    3
}

fn default_reference_limit() -> usize {
    3
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            criminal_min_candidates: default_criminal_min(),
            unfiltered_fallback: default_unfiltered_fallback(),
            supplementary_k: default_supplementary_k(),
            reference_seeds: default_reference_seeds(),
            reference_limit: default_reference_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    #[serde(default = "default_rerank_enabled")]
    pub enabled: bool,

    /// "overlap" (in-process scorer) or "http" (cross-encoder endpoint)
    #[serde(default = "default_rerank_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_rerank_top_n")]
    pub top_n: usize,
}

pub const MAX_RERANK_TOP_N: usize = 8;

fn default_rerank_enabled() -> bool {
    std::env::var("LEGAL_RAG_USE_RERANKER")
        .map(|v| v != "0")
        .unwrap_or(true)
}

fn default_rerank_provider() -> String {
    "overlap".to_string()
}

fn default_rerank_top_n() -> usize {
    5
}

impl RerankConfig {
    pub fn effective_top_n(&self) -> usize {
        self.top_n.clamp(1, MAX_RERANK_TOP_N)
    }
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: default_rerank_enabled(),
            provider: default_rerank_provider(),
            endpoint: None,
            top_n: default_rerank_top_n(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_context_max_chunks")]
    pub max_chunks: usize,

    #[serde(default = "default_context_max_chars")]
    pub max_chunk_chars: usize,

    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,
}

fn default_context_max_chunks() -> usize {
    8
}

fn default_context_max_chars() -> usize {
    4000
}

fn default_truncation_marker() -> String {
    " [...]".to_string()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_context_max_chunks(),
            max_chunk_chars: default_context_max_chars(),
            truncation_marker: default_truncation_marker(),
        }
    }
}

/// Deadline and retry settings for embedding, rerank and generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    1
}

impl BackendConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(self.timeout_secs), self.max_retries)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// A citable excerpt of a statute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier derived from source, position and text
    pub id: String,

    /// Code identifier (source file stem)
    pub source_id: String,

    /// Position within the source document
    pub position: u32,

    pub text: String,

    /// Russian code name
    pub code_ru: String,

    /// Kazakh code name
    pub code_kz: String,

    /// Article label parsed from the leading header ("136", "25-1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,

    /// Enumerated clause when the article was split
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause: Option<u32>,

    /// Leading characters copied from the previous sub-chunk, or the
    /// article heading on an article's first sub-chunk
    #[serde(default)]
    pub overlap_chars: usize,
}

impl Chunk {
    /// Leading integer of the article label.
    pub fn article_numeric(&self) -> Option<u32> {
        self.article_number.as_deref().and_then(leading_number)
    }

    /// Text without the overlap copied from the previous sub-chunk.
    pub fn own_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap_chars) {
            Some((idx, _)) => &self.text[idx..],
            None if self.overlap_chars == 0 => &self.text,
            None => "",
        }
    }
}

/// First run of ASCII digits in `label`, parsed.
pub fn leading_number(label: &str) -> Option<u32> {
    let digits: String = label
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Options for the ingest operation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Directory holding the raw statute `.txt` files
    pub documents_dir: PathBuf,

    /// Reset the base before ingesting
    pub reset: bool,
}

/// Statistics from an ingest operation, persisted as stats.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents_count: u32,
    pub chunks_count: u32,
    pub article_chunks_count: u32,
    pub reference_edges: u32,
    /// Files that could not be read
    #[serde(default)]
    pub skipped: Vec<String>,
    pub bytes_processed: u64,
    pub duration_secs: f64,
    pub ingested_at: DateTime<Utc>,
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    pub base_name: String,
    pub corpus_chunks: u32,
    pub dense_rows: u32,
    pub reference_nodes: u32,
    pub db_size_bytes: u64,
    pub last_ingest: Option<IngestStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = KnowledgeBaseConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.hybrid_k, 12);
        assert_eq!(config.segmentation.overlap_chars, 175);
    }

    #[test]
    fn test_weight_ranges_enforced() {
        let mut config = KnowledgeBaseConfig::default();
        config.retrieval.lexical_weight = 0.8;
        assert!(config.validate().is_err());

        config.retrieval.lexical_weight = 0.3;
        config.retrieval.dense_weight = 0.7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rerank_top_n_clamped() {
        let mut rerank = RerankConfig::default();
        rerank.top_n = 20;
        assert_eq!(rerank.effective_top_n(), 8);
        rerank.top_n = 0;
        assert_eq!(rerank.effective_top_n(), 1);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
name: statutes
retrieval:
  fusion: rrf
"#;
        let config: KnowledgeBaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.retrieval.fusion, FusionMethod::Rrf);
        assert_eq!(config.retrieval.rrf_k, 60.0);
        assert_eq!(config.filtering.criminal_min_candidates, 3);
    }

    #[test]
    fn test_article_numeric() {
        assert_eq!(leading_number("136"), Some(136));
        assert_eq!(leading_number("25-1"), Some(25));
        assert_eq!(leading_number("ст. 7а"), Some(7));
        assert_eq!(leading_number("без номера"), None);
    }

    #[test]
    fn test_own_text_skips_overlap() {
        let chunk = Chunk {
            id: "c".to_string(),
            source_id: "s".to_string(),
            position: 1,
            text: "хвост2. Второй пункт".to_string(),
            code_ru: String::new(),
            code_kz: String::new(),
            article_number: Some("5".to_string()),
            clause: Some(2),
            overlap_chars: 5,
        };
        assert_eq!(chunk.own_text(), "2. Второй пункт");
    }
}
