//! Scripted generation backend.
//!
//! Returns queued replies in order, then the configured default text.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use legal_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct MockClient {
    replies: Mutex<VecDeque<AppResult<String>>>,
    default_reply: String,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    /// A client that always answers with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            default_reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a one-shot reply, consumed before the default.
    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(Ok(reply.into()));
        }
    }

    /// Queue a one-shot failure.
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.replies.lock() {
            queue.push_back(Err(AppError::Llm(message.into())));
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new("")
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| AppError::Llm("mock reply queue poisoned".to_string()))?
            .pop_front();

        let content = match next {
            Some(reply) => reply?,
            None => self.default_reply.clone(),
        };

        Ok(LlmResponse {
            usage: LlmUsage::new(
                request.prompt.split_whitespace().count() as u32,
                content.split_whitespace().count() as u32,
            ),
            content,
            model: request.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_replies_then_default() {
        let client = MockClient::new("default");
        client.push_reply("first");
        client.push_error("backend down");

        let req = LlmRequest::new("q", "m");
        assert_eq!(client.complete(&req).await.unwrap().content, "first");
        assert!(client.complete(&req).await.is_err());
        assert_eq!(client.complete(&req).await.unwrap().content, "default");
        assert_eq!(client.prompts().len(), 3);
    }
}
