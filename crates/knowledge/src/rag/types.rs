//! Records that flow between the answer pipeline stages.

use crate::rag::language::Language;
use crate::types::Chunk;
use legal_core::AppError;
use legal_prompt::PromptMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Substantive legal topic a query concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainTag {
    CriminalLaw,
    Fraud,
    SubsidyFraud,
    IllegalBusiness,
    PyramidScheme,
    NeedsCircumstances,
}

impl DomainTag {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainTag::CriminalLaw => "criminal_law",
            DomainTag::Fraud => "fraud",
            DomainTag::SubsidyFraud => "subsidy_fraud",
            DomainTag::IllegalBusiness => "illegal_business",
            DomainTag::PyramidScheme => "pyramid_scheme",
            DomainTag::NeedsCircumstances => "needs_circumstances",
        }
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which retriever produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Dense,
    Lexical,
    Both,
}

/// A chunk under consideration, with its fused score and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub chunk: Chunk,
    pub score: f32,
    pub origin: Origin,
    /// Set once the reranker has scored this candidate
    pub rerank_score: Option<f32>,
}

impl Candidate {
    pub fn new(chunk: Chunk, score: f32, origin: Origin) -> Self {
        Self {
            chunk,
            score,
            origin,
            rerank_score: None,
        }
    }
}

/// Routing result for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
    /// The question as the user asked it
    pub raw_text: String,
    pub language: Language,
    pub domain_tags: BTreeSet<DomainTag>,
    /// Inclusive explicit article range
    pub article_range: Option<(u32, u32)>,
    /// Article numbers the matched tags point at
    pub focus_articles: BTreeSet<u32>,
    /// Raw text plus routing hints; used for retrieval only
    pub search_query: String,
}

impl QueryContext {
    pub fn has_tag(&self, tag: DomainTag) -> bool {
        self.domain_tags.contains(&tag)
    }

    pub fn is_criminal(&self) -> bool {
        self.has_tag(DomainTag::CriminalLaw)
    }
}

/// A cited source as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document: String,
    pub code_name: String,
    pub article_number: Option<String>,
    pub preview: String,
}

/// Why an answer was replaced by the fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NoChunks,
    Declined,
    LanguageMismatch,
    MissingCriminalCode,
    UnsupportedCitation,
    MissingRequiredArticle,
    MissingCircumstances,
}

/// Validator verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Passed(String),
    Fallback {
        text: String,
        reason: FallbackReason,
    },
}

impl ValidationOutcome {
    pub fn text(&self) -> &str {
        match self {
            ValidationOutcome::Passed(text) => text,
            ValidationOutcome::Fallback { text, .. } => text,
        }
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            ValidationOutcome::Passed(_) => None,
            ValidationOutcome::Fallback { reason, .. } => Some(*reason),
        }
    }
}

/// Result of `answer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub text: String,
    pub language: Language,
    pub sources: Vec<SourceRef>,
    pub disclaimer: String,
    pub prompt_mode: PromptMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl AnswerResponse {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// What the request boundary hands back: an answer or a structured error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    Answer(AnswerResponse),
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl ServiceResponse {
    pub fn error(kind: impl Into<String>, details: Option<String>) -> Self {
        ServiceResponse::Error {
            error: kind.into(),
            details,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ServiceResponse::Error { .. })
    }
}

impl From<AppError> for ServiceResponse {
    fn from(err: AppError) -> Self {
        ServiceResponse::error(err.kind(), Some(err.to_string()))
    }
}
