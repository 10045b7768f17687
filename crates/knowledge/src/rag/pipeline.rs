//! The `answer` entry point.
//!
//! Stages run strictly in order: route, hybrid retrieval, law-aware filter,
//! rerank, context assembly, prompt selection, generation, validation. The
//! pipeline owns only read-only indices and is shared across requests.

use crate::config::{get_index_path, get_references_path, load_config};
use crate::corpus::CorpusStore;
use crate::embeddings::{create_provider, PrefixedEmbedder};
use crate::lexical::LexicalIndex;
use crate::rag::context::ContextAssembler;
use crate::rag::filter::LawAwareFilter;
use crate::rag::hybrid::HybridRetriever;
use crate::rag::rerank::{create_cross_encoder, CrossEncoder, Reranker};
use crate::rag::router::route;
use crate::rag::selector::select_for_context;
use crate::rag::sources::map_chunks_to_sources;
use crate::rag::types::{AnswerResponse, Candidate, QueryContext, ServiceResponse, ValidationOutcome};
use crate::rag::validator::validate;
use crate::references::ReferenceGraph;
use crate::types::{Chunk, KnowledgeBaseConfig};
use crate::vector_index::InMemoryDenseIndex;
use legal_core::{AppConfig, AppError, AppResult};
use legal_llm::{create_client, with_retry, LlmClient, LlmRequest, RetryPolicy};
use legal_prompt::{build_prompt, builtin_prompt, resolve_prompt, PromptMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Generator model and sampling settings.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "mock".to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

pub struct AnswerPipeline {
    retriever: HybridRetriever,
    filter: LawAwareFilter,
    reranker: Reranker,
    assembler: ContextAssembler,
    generator: Arc<dyn LlmClient>,
    settings: GenerationSettings,
    /// Workspace searched for prompt overrides; built-ins only when unset
    prompt_workspace: Option<PathBuf>,
    policy: RetryPolicy,
    hybrid_k: usize,
}

impl AnswerPipeline {
    /// Assemble a pipeline from already-built parts.
    pub fn new(
        retriever: HybridRetriever,
        config: &KnowledgeBaseConfig,
        cross_encoder: Option<Arc<dyn CrossEncoder>>,
        generator: Arc<dyn LlmClient>,
        settings: GenerationSettings,
    ) -> Self {
        let policy = config.backend.retry_policy();
        Self {
            hybrid_k: config.retrieval.hybrid_k,
            retriever,
            filter: LawAwareFilter::new(config.filtering.clone()),
            reranker: Reranker::new(cross_encoder, config.rerank.effective_top_n(), policy),
            assembler: ContextAssembler::new(config.context.clone()),
            generator,
            settings,
            prompt_workspace: None,
            policy,
        }
    }

    pub fn with_prompt_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.prompt_workspace = Some(workspace.into());
        self
    }

    /// Follow article citations through `graph` when filtering candidates.
    pub fn with_references(mut self, graph: ReferenceGraph) -> Self {
        self.filter = self.filter.with_references(Arc::new(graph));
        self
    }

    /// Load a built knowledge base from the workspace.
    pub fn open(workspace: &Path, app_config: &AppConfig, base_name: &str) -> AppResult<Self> {
        let config = load_config(workspace, base_name)?;

        let index_path = get_index_path(workspace, base_name);
        if !index_path.exists() {
            return Err(AppError::Index(format!(
                "Knowledge base '{}' has no dense index. Run 'legal-rag ingest' first.",
                base_name
            )));
        }

        let chunks = CorpusStore::new(workspace, base_name).read_all()?;
        let lexical = LexicalIndex::build(chunks);
        let dense = InMemoryDenseIndex::load(&index_path, &config.embeddings)?;

        let policy = config.backend.retry_policy();
        let embedder =
            PrefixedEmbedder::new(create_provider(&config.embeddings)?, &config.embeddings, policy);
        let retriever = HybridRetriever::new(
            Arc::new(dense),
            Arc::new(lexical),
            embedder,
            config.retrieval.clone(),
        );

        let generator = create_client(&app_config.provider, app_config.endpoint.as_deref())
            .map_err(AppError::Config)?;

        let refs_path = get_references_path(workspace, base_name);
        let references = if refs_path.exists() {
            Some(ReferenceGraph::load(&refs_path)?)
        } else {
            tracing::warn!("No reference graph for '{}', citations will not be followed", base_name);
            None
        };

        tracing::info!(
            base = base_name,
            chunks = retriever.corpus_len(),
            references = references.as_ref().map_or(0, |g| g.edge_count()),
            provider = %app_config.provider,
            "Opened answer pipeline"
        );

        let pipeline = Self::new(
            retriever,
            &config,
            create_cross_encoder(&config.rerank)?,
            generator,
            GenerationSettings::from_app_config(app_config),
        )
        .with_prompt_workspace(workspace);

        Ok(match references {
            Some(graph) => pipeline.with_references(graph),
            None => pipeline,
        })
    }

    /// Hybrid retrieval followed by the law-aware filter.
    pub async fn retrieve(&self, ctx: &QueryContext) -> AppResult<Vec<Candidate>> {
        let candidates = self
            .retriever
            .retrieve(&ctx.search_query, self.hybrid_k)
            .await?;
        tracing::debug!(candidates = candidates.len(), "Retrieved candidates");
        self.filter.apply(&self.retriever, ctx, candidates).await
    }

    /// Answer `query` from the statute corpus.
    pub async fn answer(&self, query: &str) -> AppResult<AnswerResponse> {
        if query.trim().is_empty() {
            return Err(AppError::Other("Query is empty".to_string()));
        }

        let ctx = route(query);
        let span = tracing::info_span!(
            "answer",
            lang = %ctx.language,
            tags = ?ctx.domain_tags
        );
        self.answer_routed(ctx).instrument(span).await
    }

    /// Like [`answer`](Self::answer), but never fails: errors become a
    /// structured error response.
    pub async fn respond(&self, query: &str) -> ServiceResponse {
        match self.answer(query).await {
            Ok(response) => ServiceResponse::Answer(response),
            Err(e) => {
                tracing::error!(error = %e, "Answer failed");
                e.into()
            }
        }
    }

    async fn answer_routed(&self, ctx: QueryContext) -> AppResult<AnswerResponse> {
        let start = Instant::now();

        let candidates = self.retrieve(&ctx).await?;
        let reranked = self.reranker.rerank(&ctx.raw_text, candidates).await;
        let chunks = self.assembler.assemble(reranked);
        let mode = select_for_context(&ctx);

        let generated = if chunks.is_empty() {
            tracing::info!("No chunks survived retrieval, skipping generation");
            String::new()
        } else {
            self.generate(&ctx, mode, &chunks).await?
        };

        let outcome = validate(&ctx, &generated, &chunks);
        let sources = match &outcome {
            ValidationOutcome::Passed(_) => map_chunks_to_sources(&chunks, ctx.language),
            ValidationOutcome::Fallback { .. } => Vec::new(),
        };

        tracing::info!(
            mode = %mode,
            chunks = chunks.len(),
            fallback = outcome.fallback_reason().is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered query"
        );

        Ok(AnswerResponse {
            fallback_reason: outcome.fallback_reason(),
            text: outcome.text().to_string(),
            language: ctx.language,
            sources,
            disclaimer: ctx.language.disclaimer().to_string(),
            prompt_mode: mode,
        })
    }

    async fn generate(
        &self,
        ctx: &QueryContext,
        mode: PromptMode,
        chunks: &[Chunk],
    ) -> AppResult<String> {
        let definition = match &self.prompt_workspace {
            Some(workspace) => resolve_prompt(workspace, mode)?,
            None => builtin_prompt(mode)?,
        };

        let mut variables = HashMap::new();
        variables.insert("question".to_string(), ctx.raw_text.clone());
        variables.insert(
            "context".to_string(),
            self.assembler.render(chunks, ctx.language),
        );
        variables.insert(
            "fallback".to_string(),
            ctx.language.fallback_text().to_string(),
        );
        if let Some((start, end)) = ctx.article_range {
            variables.insert("range_start".to_string(), start.to_string());
            variables.insert("range_end".to_string(), end.to_string());
        }

        let built = build_prompt(&definition, variables)?;

        let mut request = LlmRequest::new(built.user, &self.settings.model)
            .with_temperature(self.settings.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            prompt = %definition.id,
            provider = self.generator.provider_name(),
            "Generating answer"
        );

        let response = with_retry(self.policy, "generate", || {
            self.generator.complete(&request)
        })
        .await?;

        Ok(response.content)
    }
}
