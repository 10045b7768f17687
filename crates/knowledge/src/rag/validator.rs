//! Grounding validation of generated answers.
//!
//! A fixed sequence of checks; the first failing check replaces the answer
//! with the fallback text in the question's language. Validation never
//! errors.

use crate::codes;
use crate::rag::language::{detect_language, is_fallback_text};
use crate::rag::router::tag_focus;
use crate::rag::types::{DomainTag, FallbackReason, QueryContext, ValidationOutcome};
use crate::references::{cited_articles, extract_article_refs, normalize_label};
use crate::types::{leading_number, Chunk};
use std::collections::BTreeSet;

/// Stems showing the answer talks about mitigating or aggravating
/// circumstances.
const CIRCUMSTANCE_VOCABULARY: &[&str] = &[
    "смягчающ",
    "отягчающ",
    "обстоятельств",
    "жеңілдететін",
    "ауырлататын",
    "мән-жай",
];

/// Tags whose answers must rest on one of the tag's focus articles.
const FOCUS_REQUIRED: &[DomainTag] = &[DomainTag::SubsidyFraud, DomainTag::PyramidScheme];

pub fn validate(ctx: &QueryContext, answer: &str, chunks: &[Chunk]) -> ValidationOutcome {
    match first_failure(ctx, answer, chunks) {
        Some(reason) => {
            tracing::info!(reason = ?reason, "Answer replaced by fallback");
            ValidationOutcome::Fallback {
                text: ctx.language.fallback_text().to_string(),
                reason,
            }
        }
        None => ValidationOutcome::Passed(answer.trim().to_string()),
    }
}

fn first_failure(ctx: &QueryContext, answer: &str, chunks: &[Chunk]) -> Option<FallbackReason> {
    if chunks.is_empty() {
        return Some(FallbackReason::NoChunks);
    }

    if answer.trim().is_empty() || is_fallback_text(answer) {
        return Some(FallbackReason::Declined);
    }

    if detect_language(answer) != ctx.language {
        return Some(FallbackReason::LanguageMismatch);
    }

    if ctx.is_criminal()
        && !chunks
            .iter()
            .any(|c| codes::is_criminal_code(&c.source_id, &c.code_ru, &c.code_kz))
    {
        return Some(FallbackReason::MissingCriminalCode);
    }

    let present = PresentArticles::collect(chunks);
    let cited = cited_articles(answer);
    if let Some(unsupported) = cited.iter().find(|label| !present.contains(label)) {
        tracing::debug!(article = %unsupported, "Answer cites an article absent from the context");
        return Some(FallbackReason::UnsupportedCitation);
    }

    for tag in FOCUS_REQUIRED {
        if !ctx.has_tag(*tag) {
            continue;
        }
        let focus = tag_focus(*tag);
        let in_chunks = chunks
            .iter()
            .any(|c| c.article_numeric().is_some_and(|n| focus.contains(&n)));
        let in_answer = cited
            .iter()
            .any(|label| leading_number(label).is_some_and(|n| focus.contains(&n)));
        if !in_chunks || !in_answer {
            return Some(FallbackReason::MissingRequiredArticle);
        }
    }

    if ctx.has_tag(DomainTag::NeedsCircumstances) {
        let lower = answer.to_lowercase();
        if !CIRCUMSTANCE_VOCABULARY.iter().any(|w| lower.contains(w)) {
            return Some(FallbackReason::MissingCircumstances);
        }
    }

    None
}

/// Article labels the context supports: chunk labels plus articles the
/// chunk text itself cites.
struct PresentArticles {
    labels: BTreeSet<String>,
    numbers: BTreeSet<u32>,
}

impl PresentArticles {
    fn collect(chunks: &[Chunk]) -> Self {
        let mut labels = BTreeSet::new();
        for chunk in chunks {
            if let Some(article) = &chunk.article_number {
                labels.insert(normalize_label(article));
            }
            labels.extend(extract_article_refs(&chunk.text).into_iter().map(|r| r.label));
        }
        let numbers = labels.iter().filter_map(|l| leading_number(l)).collect();
        Self { labels, numbers }
    }

    /// Exact label, or a bare number matching a present label's number.
    fn contains(&self, label: &str) -> bool {
        if self.labels.contains(label) {
            return true;
        }
        label.chars().all(|c| c.is_ascii_digit())
            && label.parse().is_ok_and(|n: u32| self.numbers.contains(&n))
    }
}
