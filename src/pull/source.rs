use async_trait::async_trait;
use serde_json::value::RawValue;

use super::error::PullError;

/// One opaque row of the remote dataset, kept exactly as the server encoded it.
pub type Record = Box<RawValue>;

/// A stably ordered, offset-paginated dataset.
///
/// Implementations make exactly one attempt per call; retries and timeouts
/// on top of that belong to [`ChunkFetcher`](super::fetch::ChunkFetcher) and
/// [`SizeOracle`](super::size::SizeOracle).
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Total number of records the remote side reports.
    async fn count(&self) -> Result<u64, PullError>;

    /// Up to `limit` records starting at `offset`, in a deterministic order.
    /// An empty page means the dataset is exhausted.
    async fn page(&self, offset: u64, limit: u64) -> Result<Vec<Record>, PullError>;
}
