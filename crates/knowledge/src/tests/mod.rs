//! End-to-end tests over in-memory fakes.

mod ingest;

use crate::codes;
use crate::embeddings::{create_provider, EmbeddingConfig, PrefixedEmbedder};
use crate::lexical::LexicalIndex;
use crate::rag::hybrid::HybridRetriever;
use crate::rag::pipeline::{AnswerPipeline, GenerationSettings};
use crate::rag::rerank::CrossEncoder;
use crate::types::{Chunk, KnowledgeBaseConfig};
use crate::vector_index::{ChunkFilter, DenseIndex, InMemoryDenseIndex};
use async_trait::async_trait;
use legal_core::{AppError, AppResult};
use legal_llm::{LlmClient, MockClient, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn statute_chunk(
    source: &str,
    article: Option<&str>,
    position: u32,
    text: &str,
) -> Chunk {
    let (code_ru, code_kz) = codes::code_names(source);
    Chunk {
        id: format!("{}-{}", source, position),
        source_id: source.to_string(),
        position,
        text: text.to_string(),
        code_ru,
        code_kz,
        article_number: article.map(str::to_string),
        clause: None,
        overlap_chars: 0,
    }
}

/// Small mixed corpus: three criminal-code articles, one of them sharing its
/// number with a civil-code article, plus civil and labor code text.
pub(crate) fn sample_corpus() -> Vec<Chunk> {
    vec![
        statute_chunk(
            "criminal_code",
            Some("53"),
            0,
            "Статья 53. Обстоятельства, смягчающие уголовную ответственность\n\
             1. Смягчающими обстоятельствами признаются совершение впервые преступления \
             небольшой тяжести, явка с повинной, активное способствование раскрытию.",
        ),
        statute_chunk(
            "criminal_code",
            Some("136"),
            1,
            "Статья 136. Подмена ребенка\n\
             1. Подмена ребенка, совершенная из корыстных или иных низменных побуждений, \
             наказывается лишением свободы на срок до пяти лет.",
        ),
        statute_chunk(
            "criminal_code",
            Some("190"),
            2,
            "Статья 190. Мошенничество\n\
             1. Мошенничество, то есть хищение чужого имущества или приобретение права на \
             чужое имущество путем обмана или злоупотребления доверием, наказывается штрафом.",
        ),
        statute_chunk(
            "civil_code",
            Some("9"),
            0,
            "Статья 9. Защита гражданских прав\n\
             1. Защита гражданских прав осуществляется судом, арбитражем или третейским судом.",
        ),
        statute_chunk(
            "civil_code",
            Some("136"),
            1,
            "Статья 136. Форма сделок\n\
             1. Сделки совершаются устно или в письменной форме, простой или нотариальной, \
             наказание за нарушение формы не предусмотрено.",
        ),
        statute_chunk(
            "labor_code",
            Some("88"),
            0,
            "Статья 88. Ежегодный оплачиваемый трудовой отпуск\n\
             1. Работникам предоставляется ежегодный оплачиваемый трудовой отпуск \
             продолжительностью двадцать четыре календарных дня.",
        ),
    ]
}

pub(crate) fn test_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(5), 1)
}

pub(crate) fn embedder() -> PrefixedEmbedder {
    let config = EmbeddingConfig::default();
    let provider = create_provider(&config).unwrap();
    PrefixedEmbedder::new(provider, &config, test_policy())
}

pub(crate) async fn dense_index_over(chunks: &[Chunk]) -> InMemoryDenseIndex {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embedder().embed_passages(&texts).await.unwrap();
    InMemoryDenseIndex::new(chunks.iter().cloned().zip(vectors).collect())
}

pub(crate) async fn retriever_over(chunks: Vec<Chunk>) -> HybridRetriever {
    let dense = dense_index_over(&chunks).await;
    retriever_with_dense(Arc::new(dense), chunks)
}

pub(crate) fn retriever_with_dense(dense: Arc<dyn DenseIndex>, chunks: Vec<Chunk>) -> HybridRetriever {
    HybridRetriever::new(
        dense,
        Arc::new(LexicalIndex::build(chunks)),
        embedder(),
        KnowledgeBaseConfig::default().retrieval,
    )
}

pub(crate) fn pipeline_from(
    retriever: HybridRetriever,
    generator: Arc<MockClient>,
    cross_encoder: Option<Arc<dyn CrossEncoder>>,
) -> AnswerPipeline {
    let generator: Arc<dyn LlmClient> = generator;
    AnswerPipeline::new(
        retriever,
        &KnowledgeBaseConfig::default(),
        cross_encoder,
        generator,
        GenerationSettings::default(),
    )
}

pub(crate) async fn pipeline_over(chunks: Vec<Chunk>, generator: Arc<MockClient>) -> AnswerPipeline {
    pipeline_from(retriever_over(chunks).await, generator, None)
}

/// Dense backend that is always unreachable.
pub(crate) struct UnreachableDense;

#[async_trait]
impl DenseIndex for UnreachableDense {
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

/// Cross-encoder whose backend is always down.
pub(crate) struct UnreachableEncoder;

#[async_trait]
impl CrossEncoder for UnreachableEncoder {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn score(&self, _query: &str, _passages: &[String]) -> AppResult<Vec<f32>> {
        Err(AppError::Rerank("503 Service Unavailable".to_string()))
    }
}
