//! Hybrid retrieval: dense + BM25, fused and deduplicated.

use crate::embeddings::PrefixedEmbedder;
use crate::lexical::LexicalIndex;
use crate::rag::types::{Candidate, Origin};
use crate::types::{Chunk, FusionMethod, RetrievalConfig};
use crate::vector_index::{ChunkFilter, DenseIndex};
use legal_core::AppResult;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only retriever shared by every request.
pub struct HybridRetriever {
    dense: Arc<dyn DenseIndex>,
    lexical: Arc<LexicalIndex>,
    embedder: PrefixedEmbedder,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        dense: Arc<dyn DenseIndex>,
        lexical: Arc<LexicalIndex>,
        embedder: PrefixedEmbedder,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            dense,
            lexical,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Chunks available to lexical search.
    pub fn corpus_len(&self) -> usize {
        self.lexical.len()
    }

    /// Fused top-k over the whole corpus.
    pub async fn retrieve(&self, query: &str, k: usize) -> AppResult<Vec<Candidate>> {
        self.retrieve_filtered(query, k, &ChunkFilter::default())
            .await
    }

    /// Fused top-k restricted to chunks matching `filter`.
    ///
    /// Embedding failures propagate. A failing dense index only removes the
    /// dense side; lexical results are still returned.
    pub async fn retrieve_filtered(
        &self,
        query: &str,
        k: usize,
        filter: &ChunkFilter,
    ) -> AppResult<Vec<Candidate>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let dense = match self.dense.search(&query_vector, k, filter).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(error = %e, "Dense search failed, continuing with lexical results");
                Vec::new()
            }
        };
        let lexical = self.lexical.search(query, k, filter);

        tracing::debug!(
            dense = dense.len(),
            lexical = lexical.len(),
            fusion = ?self.config.fusion,
            "Hybrid retrieval"
        );

        Ok(fuse(dense, lexical, &self.config, k))
    }
}

struct Entry {
    chunk: Chunk,
    dense: Option<f32>,
    lexical: Option<f32>,
}

/// Merge both ranked lists into one, keeping each chunk identity once.
pub fn fuse(
    dense: Vec<(Chunk, f32)>,
    lexical: Vec<(Chunk, f32)>,
    config: &RetrievalConfig,
    k: usize,
) -> Vec<Candidate> {
    let dense_scores = side_scores(&dense, config);
    let lexical_scores = side_scores(&lexical, config);

    let mut order: Vec<(String, String)> = Vec::new();
    let mut entries: HashMap<(String, String), Entry> = HashMap::new();

    let sides = [
        (dense, dense_scores, true),
        (lexical, lexical_scores, false),
    ];
    for (results, scores, is_dense) in sides {
        for ((chunk, _), score) in results.into_iter().zip(scores) {
            let key = dedupe_key(&chunk, config.dedupe_prefix_chars);
            let entry = entries.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Entry {
                    chunk,
                    dense: None,
                    lexical: None,
                }
            });
            let slot = if is_dense {
                &mut entry.dense
            } else {
                &mut entry.lexical
            };
            *slot = Some(slot.map_or(score, |s: f32| s.max(score)));
        }
    }

    let mut candidates: Vec<Candidate> = order
        .into_iter()
        .filter_map(|key| entries.remove(&key))
        .map(|entry| {
            let origin = match (entry.dense.is_some(), entry.lexical.is_some()) {
                (true, true) => Origin::Both,
                (true, false) => Origin::Dense,
                _ => Origin::Lexical,
            };
            let score = config.dense_weight * entry.dense.unwrap_or(0.0)
                + config.lexical_weight * entry.lexical.unwrap_or(0.0);
            Candidate::new(entry.chunk, score, origin)
        })
        .collect();

    sort_candidates(&mut candidates);
    candidates.truncate(k);
    candidates
}

/// Per-side contribution before weighting: the min-max normalized score, or
/// the reciprocal rank for RRF.
fn side_scores(results: &[(Chunk, f32)], config: &RetrievalConfig) -> Vec<f32> {
    match config.fusion {
        FusionMethod::Weighted => {
            normalize_scores(&results.iter().map(|(_, s)| *s).collect::<Vec<_>>())
        }
        FusionMethod::Rrf => (0..results.len())
            .map(|rank| 1.0 / (config.rrf_k + rank as f32 + 1.0))
            .collect(),
    }
}

/// Min-max normalize scores into [0, 1]. A list whose scores are all equal
/// maps to 1.0.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    scores
        .iter()
        .map(|s| {
            if range <= f32::EPSILON {
                1.0
            } else {
                (s - min) / range
            }
        })
        .collect()
}

/// Identity used for deduplication: source plus a prefix of the text.
pub fn dedupe_key(chunk: &Chunk, prefix_chars: usize) -> (String, String) {
    (
        chunk.source_id.clone(),
        chunk.text.chars().take(prefix_chars).collect(),
    )
}

/// Descending score; equal scores fall back to corpus order.
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.chunk.source_id.cmp(&b.chunk.source_id))
            .then_with(|| a.chunk.position.cmp(&b.chunk.position))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{create_provider, EmbeddingConfig};
    use crate::vector_index::InMemoryDenseIndex;
    use async_trait::async_trait;
    use legal_core::AppError;
    use legal_llm::RetryPolicy;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn chunk(source: &str, position: u32, text: &str) -> Chunk {
        Chunk {
            id: format!("{}-{}", source, position),
            source_id: source.to_string(),
            position,
            text: text.to_string(),
            code_ru: String::new(),
            code_kz: String::new(),
            article_number: None,
            clause: None,
            overlap_chars: 0,
        }
    }

    #[test]
    fn test_normalize_scores() {
        assert_eq!(normalize_scores(&[2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
        assert_eq!(normalize_scores(&[0.7, 0.7]), vec![1.0, 1.0]);
        assert!(normalize_scores(&[]).is_empty());
    }

    #[test]
    fn test_weighted_fusion_merges_and_marks_origin() {
        let shared = chunk("criminal_code", 3, "Статья 190. Мошенничество");
        let dense = vec![
            (shared.clone(), 0.9),
            (chunk("civil_code", 1, "Статья 9. Защита прав"), 0.5),
        ];
        let lexical = vec![
            (shared, 7.0),
            (chunk("tax_code", 2, "Статья 4. Налоги"), 2.0),
        ];

        let fused = fuse(dense, lexical, &RetrievalConfig::default(), 10);

        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].chunk.source_id, "criminal_code");
        assert_eq!(fused[0].origin, Origin::Both);
        assert!((fused[0].score - 1.0).abs() < 1e-6);
        // both tails normalize to zero; corpus order decides
        assert_eq!(fused[1].origin, Origin::Dense);
        assert_eq!(fused[1].chunk.source_id, "civil_code");
        assert_eq!(fused[2].origin, Origin::Lexical);
    }

    #[test]
    fn test_rrf_fusion() {
        let config = RetrievalConfig {
            fusion: FusionMethod::Rrf,
            ..RetrievalConfig::default()
        };
        let a = chunk("a", 0, "первый");
        let b = chunk("b", 0, "второй");
        let dense = vec![(a.clone(), 0.9), (b.clone(), 0.8)];
        let lexical = vec![(b, 5.0), (a, 1.0)];

        let fused = fuse(dense, lexical, &config, 10);

        // b: 0.4/62 + 0.6/61, a: 0.4/61 + 0.6/62
        assert_eq!(fused[0].chunk.source_id, "b");
        let expected = 0.4 / 62.0 + 0.6 / 61.0;
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_same_prefix_collapses_to_one_candidate() {
        let long_prefix = "Статья 5. ".repeat(30);
        let first = chunk("labor_code", 0, &format!("{}хвост один", long_prefix));
        let second = chunk("labor_code", 1, &format!("{}хвост два", long_prefix));

        let fused = fuse(
            vec![(first, 0.9), (second, 0.8)],
            Vec::new(),
            &RetrievalConfig::default(),
            10,
        );

        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].chunk.position, 0);
    }

    #[test]
    fn test_equal_scores_keep_corpus_order() {
        let fused = fuse(
            Vec::new(),
            vec![
                (chunk("tax_code", 1, "один"), 1.0),
                (chunk("civil_code", 4, "два"), 1.0),
                (chunk("civil_code", 2, "три"), 1.0),
            ],
            &RetrievalConfig::default(),
            10,
        );

        let order: Vec<_> = fused
            .iter()
            .map(|c| (c.chunk.source_id.as_str(), c.chunk.position))
            .collect();
        assert_eq!(
            order,
            vec![("civil_code", 2), ("civil_code", 4), ("tax_code", 1)]
        );
    }

    struct BrokenDense;

    #[async_trait]
    impl DenseIndex for BrokenDense {
        async fn search(
            &self,
            _query_embedding: &[f32],
            _top_k: usize,
            _filter: &ChunkFilter,
        ) -> AppResult<Vec<(Chunk, f32)>> {
            Err(AppError::Index("connection refused".to_string()))
        }

        fn len(&self) -> usize {
            0
        }
    }

    fn embedder() -> PrefixedEmbedder {
        let config = EmbeddingConfig::default();
        PrefixedEmbedder::new(
            create_provider(&config).unwrap(),
            &config,
            RetryPolicy::once(Duration::from_secs(5)),
        )
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("criminal_code", 0, "Статья 190. Мошенничество, хищение путём обмана"),
            chunk("criminal_code", 1, "Статья 217. Создание финансовой пирамиды"),
            chunk("labor_code", 0, "Статья 88. Трудовой отпуск работника"),
        ]
    }

    #[tokio::test]
    async fn test_dense_outage_degrades_to_lexical() {
        let retriever = HybridRetriever::new(
            Arc::new(BrokenDense),
            Arc::new(LexicalIndex::build(corpus())),
            embedder(),
            RetrievalConfig::default(),
        );

        let results = retriever.retrieve("мошенничество", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].origin, Origin::Lexical);
    }

    #[tokio::test]
    async fn test_retrieval_is_deterministic_and_unique() {
        let embedder = embedder();
        let passages: Vec<String> = corpus().iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_passages(&passages).await.unwrap();
        let dense = InMemoryDenseIndex::new(corpus().into_iter().zip(vectors).collect());

        let retriever = HybridRetriever::new(
            Arc::new(dense),
            Arc::new(LexicalIndex::build(corpus())),
            embedder,
            RetrievalConfig::default(),
        );

        let first = retriever.retrieve("финансовая пирамида", 12).await.unwrap();
        let second = retriever.retrieve("финансовая пирамида", 12).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].chunk.position, 1);
        let keys: HashSet<_> = first.iter().map(|c| dedupe_key(&c.chunk, 200)).collect();
        assert_eq!(keys.len(), first.len());
    }

    const SOURCES: [&str; 3] = ["criminal_code", "civil_code", "labor_code"];
    const TEXTS: [&str; 4] = [
        "Статья 190. Мошенничество",
        "Статья 217. Финансовая пирамида",
        "Статья 88. Трудовой отпуск",
        "Статья 9. Защита гражданских прав",
    ];

    fn ranked_side() -> impl Strategy<Value = Vec<(Chunk, f32)>> {
        prop::collection::vec((0usize..3, 0usize..4, 0u32..20, 0.0f32..10.0), 0..12).prop_map(
            |rows| {
                rows.into_iter()
                    .map(|(s, t, position, score)| (chunk(SOURCES[s], position, TEXTS[t]), score))
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn fused_candidates_are_unique_and_ordered(
            dense in ranked_side(),
            lexical in ranked_side(),
            rrf in any::<bool>(),
            k in 1usize..15,
        ) {
            let config = RetrievalConfig {
                fusion: if rrf { FusionMethod::Rrf } else { FusionMethod::Weighted },
                ..RetrievalConfig::default()
            };

            let fused = fuse(dense.clone(), lexical.clone(), &config, k);
            let again = fuse(dense, lexical, &config, k);

            prop_assert!(fused.len() <= k);
            let keys: HashSet<_> = fused.iter().map(|c| dedupe_key(&c.chunk, 200)).collect();
            prop_assert_eq!(keys.len(), fused.len());
            for pair in fused.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            prop_assert_eq!(fused, again);
        }
    }
}
