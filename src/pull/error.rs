use std::time::Duration;

use thiserror::Error;

/// Failures raised while talking to the remote dataset.
///
/// Single-attempt failures are split into `Transient` and `Permanent` so the
/// retry loop can decide whether another attempt is worthwhile; `Exhausted`
/// is what the download loop finally sees once the budget is spent.
#[derive(Debug, Error)]
pub enum PullError {
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Permanent(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("page request at offset {offset} failed after {attempts} attempt(s): {reason}")]
    Exhausted {
        offset: u64,
        attempts: usize,
        reason: String,
    },
}

impl PullError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PullError::Transient(_) | PullError::Timeout(_))
    }
}

impl From<reqwest::Error> for PullError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            PullError::Transient(format!("network error: {err}"))
        } else if err.is_decode() {
            PullError::Transient(format!("failed to decode response: {err}"))
        } else {
            PullError::Permanent(format!("request failed: {err}"))
        }
    }
}
