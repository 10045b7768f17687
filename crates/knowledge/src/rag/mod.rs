//! Grounded question answering over the statute corpus.
//!
//! Every request flows through the same typed stages: [`router`],
//! [`hybrid`], [`filter`], [`rerank`], [`context`], [`selector`], then
//! generation and [`validator`]. [`pipeline::AnswerPipeline`] wires them.

pub mod context;
pub mod filter;
pub mod hybrid;
pub mod language;
pub mod pipeline;
pub mod rerank;
pub mod router;
pub mod selector;
pub mod sources;
pub mod types;
pub mod validator;

pub use language::{detect_language, Language};
pub use pipeline::{AnswerPipeline, GenerationSettings};
pub use router::route;
pub use selector::select_prompt_mode;
pub use types::{
    AnswerResponse, Candidate, DomainTag, FallbackReason, Origin, QueryContext, ServiceResponse,
    SourceRef, ValidationOutcome,
};
