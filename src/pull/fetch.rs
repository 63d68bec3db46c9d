use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backoff::backoff::Constant;
use backoff::future::retry_notify;
use backoff::Error as BackoffError;

use super::config::RetryPolicy;
use super::error::PullError;
use super::source::{Record, RecordSource};

/// Fetches one page at a time, retrying transient failures under a
/// [`RetryPolicy`].
pub struct ChunkFetcher<'a> {
    source: &'a dyn RecordSource,
    policy: RetryPolicy,
    retries: AtomicUsize,
}

impl<'a> ChunkFetcher<'a> {
    pub fn new(source: &'a dyn RecordSource, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            retries: AtomicUsize::new(0),
        }
    }

    /// Retries performed so far across every page.
    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::Relaxed)
    }

    pub async fn fetch(&self, offset: u64, page_size: u64) -> Result<Vec<Record>, PullError> {
        let max_attempts = self.policy.max_attempts;
        let attempt_counter = AtomicUsize::new(0);
        let source = self.source;

        let result = retry_notify(
            Constant::new(self.policy.delay),
            || {
                let attempt = attempt_counter.fetch_add(1, Ordering::Relaxed) + 1;
                async move {
                    match source.page(offset, page_size).await {
                        Ok(records) => Ok(records),
                        Err(err) if err.is_retryable() && attempt < max_attempts => {
                            Err(BackoffError::transient(err))
                        }
                        Err(err) => Err(BackoffError::permanent(err)),
                    }
                }
            },
            |err: PullError, delay: Duration| {
                let attempts = attempt_counter.load(Ordering::Relaxed);
                self.retries.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    offset,
                    attempt = attempts,
                    max_attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "page request failed; retrying"
                );
            },
        )
        .await;

        result.map_err(|err| PullError::Exhausted {
            offset,
            attempts: attempt_counter.load(Ordering::Relaxed).max(1),
            reason: err.to_string(),
        })
    }
}
