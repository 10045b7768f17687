//! Embedding engine for knowledge bases.
//!
//! Provider-agnostic embedding generation. Queries and passages are embedded
//! with distinct prefixes, as asymmetric retrieval models expect.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider, PrefixedEmbedder};
