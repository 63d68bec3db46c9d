use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: u64 = 50_000;
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
// Pages of 50k rows run to tens of megabytes.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COUNT_TIMEOUT_SECS: u64 = 10;
// Last known size of the dataset; only used for display when the count query fails.
pub const DEFAULT_FALLBACK_TOTAL: u64 = 300_000_000;
pub const DEFAULT_ORDER_KEY: &str = ":id";
pub const DEFAULT_OUTPUT_PATH: &str = "data/dataset.json";

const STATE_FILE_SUFFIX: &str = ".state.json";

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

/// How to reach the remote dataset.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub dataset_url: String,
    pub app_token: Option<String>,
    pub order_key: String,
    pub request_timeout: Duration,
}

/// Everything the download loop needs; built once from CLI arguments.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub output_path: PathBuf,
    pub state_path: PathBuf,
    pub page_size: u64,
    pub retry: RetryPolicy,
    pub count_timeout: Duration,
    pub fallback_total: u64,
}

#[cfg(test)]
impl EngineConfig {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        let output_path = output_path.into();
        Self {
            state_path: default_state_path(&output_path),
            output_path,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            count_timeout: Duration::from_secs(DEFAULT_COUNT_TIMEOUT_SECS),
            fallback_total: DEFAULT_FALLBACK_TOTAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PullConfig {
    pub source: SourceConfig,
    pub engine: EngineConfig,
}

/// `data/dataset.json` -> `data/dataset.json.state.json`
pub fn default_state_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "dataset.json".into());
    name.push(STATE_FILE_SUFFIX);
    output_path.with_file_name(name)
}
