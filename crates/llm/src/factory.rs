//! LLM provider factory.
//!
//! Builds a generation client from the provider name in the application
//! configuration.

use crate::client::LlmClient;
use crate::providers::{MockClient, OllamaClient};
use std::sync::Arc;

/// Reply of the mock provider when it is selected from configuration.
const MOCK_REPLY: &str = "Информация не найдена в доступных текстах законов.";

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "mock")
/// * `endpoint` - Optional custom endpoint URL
///
/// # Errors
/// Returns an error string if the provider is unknown.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
) -> Result<Arc<dyn LlmClient>, String> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        "mock" => Ok(Arc::new(MockClient::new(MOCK_REPLY))),
        _ => Err(format!("Unknown provider: {}", provider)),
    }
}
