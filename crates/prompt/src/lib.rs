//! Prompt system for the legal RAG pipeline.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in templates for the criminal, range and universal answer modes
//! - Workspace overrides under `.legal-rag/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod templates;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, resolve_prompt};
pub use templates::builtin_prompt;
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptMode};
