//! Generation provider implementations.

mod mock;
mod ollama;

pub use mock::MockClient;
pub use ollama::OllamaClient;
