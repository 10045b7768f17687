//! Deadline and retry policy for backend calls.
//!
//! Every call to an external model (generation, embedding, reranking) runs
//! under a timeout. Transient failures get a bounded number of retries with
//! exponential backoff.

use legal_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }

    /// No retries, only the deadline.
    pub fn once(timeout: Duration) -> Self {
        Self::new(timeout, 0)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 1)
    }
}

/// Run `op` under the policy's deadline, retrying transient errors.
///
/// `label` names the call in logs and in the timeout error.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;

    loop {
        let result = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(format!(
                "{} exceeded {}ms",
                label,
                policy.timeout.as_millis()
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    call = label,
                    attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Backend call failed, retrying in {}ms",
                    backoff_ms
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(1), 1);

        let result = with_retry(policy, "embed", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::Embedding("connection reset".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(Duration::from_secs(1), 3);

        let result: AppResult<()> = with_retry(policy, "index", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Index("missing table".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Index(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_becomes_error() {
        let policy = RetryPolicy::once(Duration::from_millis(20));

        let result: AppResult<()> = with_retry(policy, "generate", || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
    }
}
