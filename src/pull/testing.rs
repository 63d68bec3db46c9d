use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::value::RawValue;

use super::error::PullError;
use super::source::{Record, RecordSource};

pub fn record(id: u64) -> Record {
    raw(&format!(r#"{{"id":{id},"name":"row-{id:09}"}}"#))
}

pub fn raw(json: &str) -> Record {
    RawValue::from_string(json.to_string()).unwrap()
}

/// In-memory dataset with injectable failures.
#[derive(Default)]
pub struct MockDataset {
    records: Vec<Record>,
    reported_count: Option<u64>,
    count_fails: bool,
    count_delay: Option<Duration>,
    transient_failures: Mutex<HashMap<u64, usize>>,
    permanent_failures: Vec<u64>,
    requests: Mutex<Vec<(u64, u64)>>,
}

impl MockDataset {
    pub fn with_records(count: u64) -> Self {
        Self {
            records: (0..count).map(record).collect(),
            ..Self::default()
        }
    }

    /// Count query answers `count` regardless of how many records exist.
    pub fn reporting_count(mut self, count: u64) -> Self {
        self.reported_count = Some(count);
        self
    }

    pub fn failing_count(mut self) -> Self {
        self.count_fails = true;
        self
    }

    pub fn count_delay(mut self, delay: Duration) -> Self {
        self.count_delay = Some(delay);
        self
    }

    /// The next `times` page requests at `offset` fail with a retryable error.
    pub fn fail_transiently_at(self, offset: u64, times: usize) -> Self {
        self.transient_failures
            .lock()
            .unwrap()
            .insert(offset, times);
        self
    }

    pub fn fail_permanently_at(mut self, offset: u64) -> Self {
        self.permanent_failures.push(offset);
        self
    }

    /// Lets a previously failing offset succeed again, as after a network outage.
    pub fn heal(&mut self) {
        self.transient_failures.lock().unwrap().clear();
        self.permanent_failures.clear();
    }

    pub fn page_requests(&self) -> Vec<(u64, u64)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl RecordSource for MockDataset {
    async fn count(&self) -> Result<u64, PullError> {
        if let Some(delay) = self.count_delay {
            tokio::time::sleep(delay).await;
        }
        if self.count_fails {
            return Err(PullError::Transient("count endpoint unavailable".to_string()));
        }
        Ok(self.reported_count.unwrap_or(self.records.len() as u64))
    }

    async fn page(&self, offset: u64, limit: u64) -> Result<Vec<Record>, PullError> {
        self.requests.lock().unwrap().push((offset, limit));

        if self.permanent_failures.contains(&offset) {
            return Err(PullError::Permanent(format!("HTTP 400 at offset {offset}")));
        }
        {
            let mut failures = self.transient_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&offset) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PullError::Transient(format!("HTTP 503 at offset {offset}")));
                }
            }
        }

        let start = (offset as usize).min(self.records.len());
        let end = start.saturating_add(limit as usize).min(self.records.len());
        Ok(self.records[start..end].to_vec())
    }
}
