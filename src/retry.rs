use std::future::Future;
use std::time::Duration;

use crate::constant::{STORE_MAX_ATTEMPTS, STORE_RETRY_DELAY};

/// Fixed-backoff retry, for idempotent store calls only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: STORE_MAX_ATTEMPTS,
            delay: STORE_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    tracing::error!(
                        attempt,
                        max = self.max_attempts,
                        error = %e,
                        "{what} exhausted retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max = self.max_attempts,
                        delay = ?self.delay,
                        error = %e,
                        "{what} failed; retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }

    /// Synchronous flavour of [`RetryPolicy::run`] for blocking store calls.
    pub async fn run_sync<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        self.run(what, || std::future::ready(op())).await
    }
}
