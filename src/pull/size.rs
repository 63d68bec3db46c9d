use std::time::Duration;

use super::error::PullError;
use super::source::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalSource {
    Remote,
    Fallback,
}

/// Advisory record count used as the progress denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalEstimate {
    pub records: u64,
    pub source: TotalSource,
}

/// Resolves the dataset size with a short timeout and a fixed fallback.
#[derive(Debug, Clone, Copy)]
pub struct SizeOracle {
    timeout: Duration,
    fallback_total: u64,
}

impl SizeOracle {
    pub fn new(timeout: Duration, fallback_total: u64) -> Self {
        Self {
            timeout,
            fallback_total,
        }
    }

    pub async fn resolve_total(&self, source: &dyn RecordSource) -> TotalEstimate {
        let result = match tokio::time::timeout(self.timeout, source.count()).await {
            Ok(result) => result,
            Err(_) => Err(PullError::Timeout(self.timeout)),
        };

        match result {
            Ok(records) => {
                tracing::debug!(records, "resolved dataset size");
                TotalEstimate {
                    records,
                    source: TotalSource::Remote,
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    fallback = self.fallback_total,
                    "count query failed; using approximate dataset size"
                );
                TotalEstimate {
                    records: self.fallback_total,
                    source: TotalSource::Fallback,
                }
            }
        }
    }
}
