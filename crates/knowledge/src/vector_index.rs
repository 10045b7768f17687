//! Dense index abstraction for knowledge chunks.
//!
//! The pipeline only sees the [`DenseIndex`] trait. The shipped
//! implementation keeps every vector in memory after loading them from
//! `dense.sqlite`; it is read-only and shared across requests.

use crate::codes;
use crate::embeddings::EmbeddingConfig;
use crate::index;
use crate::references::normalize_label;
use crate::types::Chunk;
use async_trait::async_trait;
use legal_core::AppResult;
use std::cmp::Ordering;
use std::path::Path;

/// Metadata restriction applied before ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFilter {
    /// Keep only chunks from the criminal code
    pub criminal_only: bool,

    /// Keep only chunks of this source
    pub source: Option<String>,

    /// Keep only chunks whose normalized article label is in this set
    /// (empty = any)
    pub articles: Vec<String>,
}

impl ChunkFilter {
    pub fn criminal() -> Self {
        Self {
            criminal_only: true,
            ..Default::default()
        }
    }

    /// One article of one code.
    pub fn article(source: &str, label: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            articles: vec![normalize_label(label)],
            ..Default::default()
        }
    }

    pub fn matches(&self, chunk: &Chunk) -> bool {
        if self.criminal_only
            && !codes::is_criminal_code(&chunk.source_id, &chunk.code_ru, &chunk.code_kz)
        {
            return false;
        }
        if self.source.as_ref().is_some_and(|s| *s != chunk.source_id) {
            return false;
        }
        if !self.articles.is_empty() {
            return chunk
                .article_number
                .as_deref()
                .is_some_and(|a| self.articles.contains(&normalize_label(a)));
        }
        true
    }
}

/// Query-by-embedding over the chunk corpus.
#[async_trait]
pub trait DenseIndex: Send + Sync {
    /// Top-k chunks by similarity, highest first. Equal scores keep corpus
    /// order (source id, then position).
    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: &ChunkFilter,
    ) -> AppResult<Vec<(Chunk, f32)>>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Brute-force cosine index held in memory.
#[derive(Debug, Default)]
pub struct InMemoryDenseIndex {
    rows: Vec<(Chunk, Vec<f32>)>,
}

impl InMemoryDenseIndex {
    pub fn new(rows: Vec<(Chunk, Vec<f32>)>) -> Self {
        Self { rows }
    }

    /// Load from a SQLite index, refusing vectors built with another model.
    pub fn load(db_path: &Path, expected: &EmbeddingConfig) -> AppResult<Self> {
        let conn = index::init_index(db_path)?;

        if let Some((model, dimensions)) = index::read_meta(&conn)? {
            let stored = EmbeddingConfig {
                model,
                dimensions,
                ..expected.clone()
            };
            expected.validate_consistency(&stored)?;
        }

        let rows = index::load_rows(&conn)?;
        tracing::debug!("Loaded {} dense vectors from {:?}", rows.len(), db_path);
        Ok(Self::new(rows))
    }
}

#[async_trait]
impl DenseIndex for InMemoryDenseIndex {
    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filter: &ChunkFilter,
    ) -> AppResult<Vec<(Chunk, f32)>> {
        let mut results: Vec<(&Chunk, f32)> = self
            .rows
            .iter()
            .filter(|(chunk, _)| filter.matches(chunk))
            .map(|(chunk, vector)| (chunk, cosine_similarity(query_embedding, vector)))
            .collect();

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.source_id.cmp(&b.0.source_id))
                .then_with(|| a.0.position.cmp(&b.0.position))
        });
        results.truncate(top_k);

        tracing::debug!(
            "Dense search returned {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results
            .into_iter()
            .map(|(chunk, score)| (chunk.clone(), score))
            .collect())
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Calculate cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
