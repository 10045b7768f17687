//! Law-aware candidate filtering.
//!
//! Runs between retrieval and reranking. Restricts criminal-law questions to
//! the criminal code, pulls in circumstance articles when asked for, follows
//! the citations of the strongest candidates through the reference graph,
//! and narrows to focus or range articles when any candidate carries one.

use crate::codes;
use crate::rag::hybrid::{sort_candidates, HybridRetriever};
use crate::rag::types::{Candidate, DomainTag, QueryContext};
use crate::references::{node_id, normalize_label, ReferenceGraph};
use crate::types::FilterConfig;
use crate::vector_index::ChunkFilter;
use legal_core::AppResult;
use std::collections::HashSet;
use std::sync::Arc;

const CIRCUMSTANCE_QUERIES: &[&str] = &[
    "обстоятельства, смягчающие уголовную ответственность и наказание",
    "обстоятельства, отягчающие уголовную ответственность и наказание",
    "қылмыстық жауаптылық пен жазаны жеңілдететін мән-жайлар",
    "қылмыстық жауаптылық пен жазаны ауырлататын мән-жайлар",
];

/// Share of the citing candidate's score given to an article it cites.
const REFERENCE_SCORE_FACTOR: f32 = 0.5;

pub struct LawAwareFilter {
    config: FilterConfig,
    references: Option<Arc<ReferenceGraph>>,
}

impl LawAwareFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            references: None,
        }
    }

    pub fn with_references(mut self, graph: Arc<ReferenceGraph>) -> Self {
        self.references = Some(graph);
        self
    }

    pub async fn apply(
        &self,
        retriever: &HybridRetriever,
        ctx: &QueryContext,
        candidates: Vec<Candidate>,
    ) -> AppResult<Vec<Candidate>> {
        let mut current = candidates;

        if ctx.is_criminal() {
            current = self.restrict_to_criminal(retriever, ctx, current).await?;
        }

        if ctx.has_tag(DomainTag::NeedsCircumstances) {
            let filter = if ctx.is_criminal() {
                ChunkFilter::criminal()
            } else {
                ChunkFilter::default()
            };
            for query in CIRCUMSTANCE_QUERIES {
                let extra = retriever
                    .retrieve_filtered(query, self.config.supplementary_k, &filter)
                    .await?;
                merge_unique(&mut current, extra);
            }
        }

        if let Some(graph) = &self.references {
            self.follow_references(retriever, graph, ctx, &mut current)
                .await?;
        }

        if !ctx.focus_articles.is_empty() {
            current = narrow(current, |n| ctx.focus_articles.contains(&n), "focus");
        }

        if let Some((start, end)) = ctx.article_range {
            current = narrow(current, |n| (start..=end).contains(&n), "range");
        }

        sort_candidates(&mut current);
        tracing::debug!(candidates = current.len(), "Law-aware filter applied");
        Ok(current)
    }

    async fn restrict_to_criminal(
        &self,
        retriever: &HybridRetriever,
        ctx: &QueryContext,
        candidates: Vec<Candidate>,
    ) -> AppResult<Vec<Candidate>> {
        let unfiltered: Vec<Candidate> = candidates
            .iter()
            .take(self.config.unfiltered_fallback)
            .cloned()
            .collect();

        let mut kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| is_criminal_candidate(c))
            .collect();

        let filter = ChunkFilter::criminal();
        for query in supplementary_queries(ctx) {
            if kept.len() >= self.config.criminal_min_candidates {
                break;
            }
            let extra = retriever
                .retrieve_filtered(&query, self.config.supplementary_k, &filter)
                .await?;
            tracing::debug!(query = %query, found = extra.len(), "Supplementary criminal lookup");
            merge_unique(&mut kept, extra);
        }

        if kept.is_empty() {
            tracing::warn!(
                "No criminal-code candidates for a criminal-law question, keeping unfiltered top {}",
                unfiltered.len()
            );
            return Ok(unfiltered);
        }

        Ok(kept)
    }

    /// Look up the articles cited by the top candidates and merge them in,
    /// scored below the candidate that cites them.
    async fn follow_references(
        &self,
        retriever: &HybridRetriever,
        graph: &ReferenceGraph,
        ctx: &QueryContext,
        current: &mut Vec<Candidate>,
    ) -> AppResult<()> {
        let mut present: HashSet<String> = current
            .iter()
            .map(|c| node_id(&c.chunk.source_id, c.chunk.article_number.as_deref()))
            .collect();

        let mut targets: Vec<(String, f32)> = Vec::new();
        for seed in current.iter().take(self.config.reference_seeds) {
            let node = node_id(&seed.chunk.source_id, seed.chunk.article_number.as_deref());
            for target in graph.related(&node) {
                if present.insert(target.clone()) {
                    targets.push((target.clone(), seed.score * REFERENCE_SCORE_FACTOR));
                }
            }
        }

        for (target, score) in targets.into_iter().take(self.config.reference_limit) {
            let Some((source, article)) = target.split_once("::") else {
                continue;
            };
            let filter = ChunkFilter {
                criminal_only: ctx.is_criminal(),
                ..ChunkFilter::article(source, article)
            };
            let found = retriever
                .retrieve_filtered(&ctx.search_query, 1, &filter)
                .await?;
            tracing::debug!(target = %target, found = found.len(), "Followed article reference");

            let extra = found
                .into_iter()
                .map(|c| Candidate { score, ..c })
                .collect();
            merge_unique(current, extra);
        }
        Ok(())
    }
}

fn is_criminal_candidate(candidate: &Candidate) -> bool {
    let chunk = &candidate.chunk;
    codes::is_criminal_code(&chunk.source_id, &chunk.code_ru, &chunk.code_kz)
}

/// Lookups tried in order until enough criminal-code candidates are found.
fn supplementary_queries(ctx: &QueryContext) -> Vec<String> {
    let mut queries = vec![ctx.search_query.clone()];
    if ctx.raw_text != ctx.search_query {
        queries.push(ctx.raw_text.clone());
    }

    let mut articles: Vec<u32> = ctx.focus_articles.iter().copied().collect();
    if let Some((start, end)) = ctx.article_range {
        articles.extend(start..=end);
    }
    articles.sort_unstable();
    articles.dedup();
    queries.extend(articles.into_iter().map(|n| format!("статья {}", n)));
    queries
}

/// Keep only candidates whose article satisfies `keep`, unless none does.
fn narrow(candidates: Vec<Candidate>, keep: impl Fn(u32) -> bool, label: &str) -> Vec<Candidate> {
    let matches = |c: &Candidate| c.chunk.article_numeric().is_some_and(&keep);
    if !candidates.iter().any(|c| matches(c)) {
        tracing::debug!(narrowing = label, "No candidate matches, leaving unnarrowed");
        return candidates;
    }
    candidates.into_iter().filter(|c| matches(c)).collect()
}

/// Merge key: source plus article label, or the chunk id for unlabelled text.
fn merge_key(candidate: &Candidate) -> (String, String) {
    let chunk = &candidate.chunk;
    let second = match &chunk.article_number {
        Some(article) => normalize_label(article),
        None => chunk.id.clone(),
    };
    (chunk.source_id.clone(), second)
}

/// Append `extra` candidates whose key is not already present.
pub fn merge_unique(into: &mut Vec<Candidate>, extra: Vec<Candidate>) {
    let mut seen: HashSet<(String, String)> = into.iter().map(merge_key).collect();
    for candidate in extra {
        if seen.insert(merge_key(&candidate)) {
            into.push(candidate);
        }
    }
}
