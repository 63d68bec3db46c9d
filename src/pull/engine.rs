use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::config::EngineConfig;
use super::error::PullError;
use super::estimate::ProgressUpdate;
use super::fetch::ChunkFetcher;
use super::limit::{self, ByteBudget, LimitNegotiator, LimitResolution, LimitSituation};
use super::size::{SizeOracle, TotalEstimate};
use super::source::RecordSource;
use super::state::{DownloadState, ResumeStateStore};
use super::writer::JsonArrayWriter;

/// Receives progress after every committed chunk. Purely observational.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: &ProgressUpdate);

    fn finish(&self) {}
}

/// Discards every update.
#[cfg(test)]
pub struct NoProgress;

#[cfg(test)]
impl ProgressSink for NoProgress {
    fn report(&self, _update: &ProgressUpdate) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    LimitReached { limit: u64 },
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Dataset exhausted; array closed and resume state removed.
    Completed,
    /// Stopped on purpose; resume state kept.
    Paused(PauseReason),
    /// Retry budget exhausted; resume state kept at the last committed offset.
    Failed { reason: String },
    /// Operator declined to continue during limit negotiation. Nothing touched.
    Aborted,
}


#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub start_offset: u64,
    pub offset: u64,
    pub bytes_downloaded: u64,
    pub budget: Option<ByteBudget>,
    pub total: Option<TotalEstimate>,
    pub pages: u64,
    pub retries: usize,
    pub elapsed: Duration,
}

impl RunReport {
    /// Whether a saved offset is waiting for the next run.
    pub fn is_resumable(&self) -> bool {
        match self.outcome {
            RunOutcome::Completed => false,
            RunOutcome::Aborted => self.start_offset > 0,
            RunOutcome::Paused(_) | RunOutcome::Failed { .. } => true,
        }
    }

    fn idle(outcome: RunOutcome, state: &DownloadState, bytes: u64, started: Instant) -> Self {
        RunReport {
            outcome,
            start_offset: state.offset,
            offset: state.offset,
            bytes_downloaded: bytes,
            budget: None,
            total: None,
            pages: 0,
            retries: 0,
            elapsed: started.elapsed(),
        }
    }
}

/// Drives one run: load state, negotiate the budget, resolve the total, then
/// fetch and append pages until the dataset is exhausted or the run stops.
pub struct Downloader<'a> {
    config: &'a EngineConfig,
    source: &'a dyn RecordSource,
    negotiator: &'a dyn LimitNegotiator,
    progress: &'a dyn ProgressSink,
    interrupted: Arc<AtomicBool>,
}

impl<'a> Downloader<'a> {
    pub fn new(
        config: &'a EngineConfig,
        source: &'a dyn RecordSource,
        negotiator: &'a dyn LimitNegotiator,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            config,
            source,
            negotiator,
            progress,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked at every chunk boundary; setting it pauses the run.
    pub fn with_interrupt_flag(mut self, interrupted: Arc<AtomicBool>) -> Self {
        self.interrupted = interrupted;
        self
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let store = ResumeStateStore::new(&self.config.state_path);

        let (mut state, bytes_on_disk) = self.initialize(&store).await?;
        let start_offset = state.offset;

        let situation = LimitSituation::assess(bytes_on_disk, state.limit_bytes);
        let decision = self
            .negotiator
            .negotiate(situation)
            .context("limit negotiation failed")?;
        let budget = match limit::resolve(state.limit_bytes, decision) {
            LimitResolution::Proceed(budget) => budget,
            LimitResolution::Abort => {
                tracing::info!(offset = state.offset, "download aborted during limit negotiation");
                self.progress.finish();
                return Ok(RunReport::idle(RunOutcome::Aborted, &state, bytes_on_disk, started));
            }
        };
        state.limit_bytes = budget.limit();

        // A budget already spent needs no count query and no page request.
        if let ByteBudget::LimitBytes(limit) = budget {
            if state.offset > 0 && budget.is_reached(bytes_on_disk) {
                tracing::debug!(offset = state.offset, limit, "byte limit already reached");
                state.committed_bytes = Some(bytes_on_disk);
                store.save(&state).await?;
                self.progress.finish();
                let outcome = RunOutcome::Paused(PauseReason::LimitReached { limit });
                return Ok(RunReport {
                    budget: Some(budget),
                    ..RunReport::idle(outcome, &state, bytes_on_disk, started)
                });
            }
        }

        let total = SizeOracle::new(self.config.count_timeout, self.config.fallback_total)
            .resolve_total(self.source)
            .await;

        let mut writer = if state.offset == 0 {
            JsonArrayWriter::create(&self.config.output_path).await?
        } else {
            JsonArrayWriter::resume(&self.config.output_path, bytes_on_disk).await?
        };
        state.committed_bytes = Some(writer.bytes_written());
        writer.sync().await?;
        store.save(&state).await?;

        let fetcher = ChunkFetcher::new(self.source, self.config.retry);
        let mut pages = 0u64;
        self.progress.report(&ProgressUpdate::new(
            state.offset,
            total.records,
            writer.bytes_written(),
            0,
        ));

        let outcome = loop {
            if self.interrupted.load(Ordering::SeqCst) {
                break RunOutcome::Paused(PauseReason::Interrupted);
            }

            let page = match fetcher.fetch(state.offset, self.config.page_size).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!(offset = state.offset, error = %err, "giving up on page");
                    break err.into();
                }
            };

            if page.is_empty() {
                break RunOutcome::Completed;
            }

            // Checked before writing: the fetched page is dropped rather than
            // pushing the file past the budget.
            if let ByteBudget::LimitBytes(limit) = budget {
                if budget.is_reached(writer.bytes_written()) {
                    tracing::debug!(
                        offset = state.offset,
                        discarded = page.len(),
                        "byte limit reached; discarding fetched page"
                    );
                    break RunOutcome::Paused(PauseReason::LimitReached { limit });
                }
            }

            writer.append_chunk(&page, state.offset == 0).await?;
            // Offset may only be persisted once the bytes behind it are durable.
            writer.sync().await?;
            state.offset += page.len() as u64;
            state.committed_bytes = Some(writer.bytes_written());
            store.save(&state).await?;
            pages += 1;

            tracing::debug!(
                offset = state.offset,
                records = page.len(),
                bytes = writer.bytes_written(),
                "committed page"
            );
            self.progress.report(&ProgressUpdate::new(
                state.offset,
                total.records,
                writer.bytes_written(),
                fetcher.retries(),
            ));
        };

        let completed = outcome == RunOutcome::Completed;
        let bytes_downloaded = writer.finalize(completed).await?;
        if completed {
            store.clear().await?;
        }
        self.progress.finish();

        Ok(RunReport {
            outcome,
            start_offset,
            offset: state.offset,
            bytes_downloaded,
            budget: Some(budget),
            total: Some(total),
            pages,
            retries: fetcher.retries(),
            elapsed: started.elapsed(),
        })
    }

    /// Loads saved state and reconciles it with what is on disk. Returns the
    /// state to continue from and the number of committed output bytes.
    async fn initialize(&self, store: &ResumeStateStore) -> Result<(DownloadState, u64)> {
        let state = store.load().await;
        if state.offset == 0 {
            return Ok((state, 0));
        }

        let output = &self.config.output_path;
        let on_disk = match tokio::fs::metadata(output).await {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    offset = state.offset,
                    path = %output.display(),
                    "resume state points at a missing output file; starting over"
                );
                return Ok((restart(state), 0));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", output.display()))
            }
        };

        match state.committed_bytes {
            Some(committed) if on_disk < committed => {
                tracing::warn!(
                    offset = state.offset,
                    committed,
                    on_disk,
                    path = %output.display(),
                    "output file is shorter than its committed length; starting over"
                );
                Ok((restart(state), 0))
            }
            Some(committed) => Ok((state, committed)),
            None => Ok((state, on_disk)),
        }
    }
}

fn restart(state: DownloadState) -> DownloadState {
    DownloadState {
        offset: 0,
        limit_bytes: state.limit_bytes,
        committed_bytes: None,
    }
}

impl From<PullError> for RunOutcome {
    fn from(err: PullError) -> Self {
        RunOutcome::Failed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;
    use crate::pull::config::RetryPolicy;
    use crate::pull::limit::{FixedDecision, LimitDecision};
    use crate::pull::size::TotalSource;
    use crate::pull::testing::MockDataset;

    fn test_config(dir: &tempfile::TempDir, page_size: u64) -> EngineConfig {
        let mut config = EngineConfig::new(dir.path().join("dataset.json"));
        config.page_size = page_size;
        config.retry = RetryPolicy::fixed(3, Duration::ZERO);
        config.count_timeout = Duration::from_secs(1);
        config.fallback_total = 1_000_000;
        config
    }

    async fn run_once(
        config: &EngineConfig,
        dataset: &MockDataset,
        decision: LimitDecision,
    ) -> RunReport {
        let negotiator = FixedDecision(decision);
        Downloader::new(config, dataset, &negotiator, &NoProgress)
            .run()
            .await
            .unwrap()
    }

    fn saved_state(config: &EngineConfig) -> Option<Value> {
        std::fs::read_to_string(&config.state_path)
            .ok()
            .map(|text| serde_json::from_str(&text).unwrap())
    }

    fn read_prefix(path: &Path) -> Vec<Value> {
        let mut text = std::fs::read_to_string(path).unwrap();
        assert!(!text.ends_with(']'), "array must stay open while resumable");
        text.push(']');
        serde_json::from_str(&text).unwrap()
    }

    fn ids(values: &[Value]) -> Vec<u64> {
        values.iter().map(|v| v["id"].as_u64().unwrap()).collect()
    }

    #[derive(Default)]
    struct RecordingProgress {
        updates: Mutex<Vec<ProgressUpdate>>,
        interrupt_after: Option<(u64, Arc<AtomicBool>)>,
    }

    impl ProgressSink for RecordingProgress {
        fn report(&self, update: &ProgressUpdate) {
            self.updates.lock().unwrap().push(*update);
            if let Some((offset, flag)) = &self.interrupt_after {
                if update.offset >= *offset {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    #[tokio::test]
    async fn uninterrupted_run_completes_after_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 50_000);
        let dataset = MockDataset::with_records(150_000);

        let report = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.offset, 150_000);
        assert_eq!(report.pages, 3);
        assert_eq!(
            dataset.page_requests(),
            vec![(0, 50_000), (50_000, 50_000), (100_000, 50_000), (150_000, 50_000)]
        );
        let text = std::fs::read_to_string(&config.output_path).unwrap();
        let values: Vec<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(ids(&values), (0..150_000).collect::<Vec<_>>());
        assert_eq!(report.bytes_downloaded, text.len() as u64);
        assert!(saved_state(&config).is_none());
    }

    #[tokio::test]
    async fn resumed_run_matches_uninterrupted_run() {
        let clean_dir = tempfile::tempdir().unwrap();
        let clean_config = test_config(&clean_dir, 50_000);
        let clean = MockDataset::with_records(150_000);
        run_once(&clean_config, &clean, LimitDecision::ResumeAsIs).await;
        let expected = std::fs::read(&clean_config.output_path).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 50_000);
        let mut dataset =
            MockDataset::with_records(150_000).fail_transiently_at(100_000, usize::MAX);

        let first = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;
        assert!(matches!(first.outcome, RunOutcome::Failed { .. }));
        assert_eq!(first.offset, 100_000);
        assert_eq!(saved_state(&config).unwrap()["offset"], 100_000);
        assert_eq!(read_prefix(&config.output_path).len(), 100_000);

        dataset.heal();
        dataset.clear_requests();
        let second = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        assert_eq!(second.outcome, RunOutcome::Completed);
        assert_eq!(second.start_offset, 100_000);
        assert_eq!(second.offset, 150_000);
        assert_eq!(
            dataset.page_requests(),
            vec![(100_000, 50_000), (150_000, 50_000)]
        );
        assert_eq!(std::fs::read(&config.output_path).unwrap(), expected);
        assert!(saved_state(&config).is_none());
    }

    #[tokio::test]
    async fn separators_are_exact_across_resume_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 4);
        let mut dataset = MockDataset::with_records(10).fail_transiently_at(4, usize::MAX);

        run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;
        dataset.heal();
        let dataset = dataset.fail_transiently_at(8, usize::MAX);
        let second = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;
        assert_eq!(second.offset, 8);

        let text = std::fs::read_to_string(&config.output_path).unwrap();
        assert!(text.starts_with("[{"));
        assert!(text.ends_with('}'));
        // Records hold no nested objects, so top-level separators are "},{".
        assert_eq!(text.matches("},{").count(), 7);
        assert_eq!(ids(&read_prefix(&config.output_path)), (0..8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn offset_never_decreases_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 3);
        let mut offsets = Vec::new();

        for fail_at in [3u64, 9, 12] {
            let dataset = MockDataset::with_records(14).fail_transiently_at(fail_at, usize::MAX);
            let report = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;
            offsets.push(report.offset);
        }
        let dataset = MockDataset::with_records(14);
        let last = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;
        offsets.push(last.offset);

        assert_eq!(offsets, vec![3, 9, 12, 14]);
        assert_eq!(last.outcome, RunOutcome::Completed);
    }

    #[tokio::test]
    async fn limit_stops_before_exceeding_budget_by_a_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(1_000);
        let budget = 2_000u64;

        let report = run_once(&config, &dataset, LimitDecision::Replace(budget)).await;

        assert_eq!(report.outcome, RunOutcome::Paused(PauseReason::LimitReached { limit: budget }));
        let size = std::fs::metadata(&config.output_path).unwrap().len();
        let chunk_weight = 10 * (crate::pull::testing::record(999).get().len() as u64 + 1);
        assert!(size >= budget, "stops only once the budget is spent");
        assert!(size < budget + chunk_weight);
        assert_eq!(report.bytes_downloaded, size);
        assert_eq!(read_prefix(&config.output_path).len() as u64, report.offset);

        let state = saved_state(&config).unwrap();
        assert_eq!(state["offset"], report.offset);
        assert_eq!(state["limit_bytes"], budget);
        // The page fetched after the budget ran out was discarded.
        assert_eq!(dataset.page_requests().len() as u64, report.offset / 10 + 1);
    }

    #[tokio::test]
    async fn reached_limit_can_be_extended_on_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(100);

        let first = run_once(&config, &dataset, LimitDecision::Replace(500)).await;
        assert!(matches!(first.outcome, RunOutcome::Paused(PauseReason::LimitReached { .. })));

        let second = run_once(&config, &dataset, LimitDecision::Extend(500)).await;
        assert_eq!(second.budget, Some(ByteBudget::LimitBytes(1_000)));
        assert!(second.offset > first.offset);
        assert_eq!(saved_state(&config).unwrap()["limit_bytes"], 1_000);

        let third = run_once(&config, &dataset, LimitDecision::Unlimited).await;
        assert_eq!(third.outcome, RunOutcome::Completed);
        assert_eq!(third.offset, 100);
        let values: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
        assert_eq!(ids(&values), (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn spent_budget_pauses_without_contacting_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let first = run_once(&config, &MockDataset::with_records(100), LimitDecision::Replace(500)).await;
        assert_eq!(first.outcome, RunOutcome::Paused(PauseReason::LimitReached { limit: 500 }));
        let before = std::fs::read(&config.output_path).unwrap();

        let unreachable = MockDataset::with_records(100)
            .fail_transiently_at(first.offset, usize::MAX)
            .failing_count();
        let second = run_once(&config, &unreachable, LimitDecision::ResumeAsIs).await;

        assert_eq!(second.outcome, RunOutcome::Paused(PauseReason::LimitReached { limit: 500 }));
        assert_eq!(second.offset, first.offset);
        assert!(second.is_resumable());
        assert!(unreachable.page_requests().is_empty());
        assert_eq!(std::fs::read(&config.output_path).unwrap(), before);
        let state = saved_state(&config).unwrap();
        assert_eq!(state["offset"], first.offset);
        assert_eq!(state["limit_bytes"], 500);
    }

    #[tokio::test]
    async fn empty_page_completes_even_below_estimated_total() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(25).reporting_count(1_000);

        let report = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.offset, 25);
        assert_eq!(report.total.unwrap().records, 1_000);
        assert!(saved_state(&config).is_none());
    }

    #[tokio::test]
    async fn count_timeout_falls_back_and_run_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir, 10);
        config.count_timeout = Duration::from_millis(50);
        let dataset = MockDataset::with_records(25).count_delay(Duration::from_secs(30));
        let progress = RecordingProgress::default();
        let negotiator = FixedDecision(LimitDecision::ResumeAsIs);

        let report = Downloader::new(&config, &dataset, &negotiator, &progress)
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(
            report.total,
            Some(TotalEstimate {
                records: 1_000_000,
                source: TotalSource::Fallback
            })
        );
        let updates = progress.updates.lock().unwrap();
        assert!(updates.iter().all(|u| u.total_records == 1_000_000));
        assert_eq!(updates.last().unwrap().offset, 25);
    }

    #[tokio::test]
    async fn progress_reports_monotonic_offsets_and_estimates() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(30);
        let progress = RecordingProgress::default();
        let negotiator = FixedDecision(LimitDecision::ResumeAsIs);

        Downloader::new(&config, &dataset, &negotiator, &progress)
            .run()
            .await
            .unwrap();

        let updates = progress.updates.lock().unwrap();
        let offsets: Vec<u64> = updates.iter().map(|u| u.offset).collect();
        assert_eq!(offsets, vec![0, 10, 20, 30]);
        let last = updates.last().unwrap();
        assert_eq!(last.estimated_total_bytes, last.bytes_downloaded);
    }

    #[tokio::test]
    async fn interrupt_pauses_at_chunk_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(100);
        let flag = Arc::new(AtomicBool::new(false));
        let progress = RecordingProgress {
            interrupt_after: Some((20, Arc::clone(&flag))),
            ..RecordingProgress::default()
        };
        let negotiator = FixedDecision(LimitDecision::ResumeAsIs);

        let report = Downloader::new(&config, &dataset, &negotiator, &progress)
            .with_interrupt_flag(flag)
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, RunOutcome::Paused(PauseReason::Interrupted));
        assert_eq!(report.offset, 20);
        assert_eq!(saved_state(&config).unwrap()["offset"], 20);
        assert_eq!(read_prefix(&config.output_path).len(), 20);
    }

    #[tokio::test]
    async fn abort_leaves_everything_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(100);

        let report = run_once(&config, &dataset, LimitDecision::Abort).await;

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert!(!report.is_resumable());
        assert!(!config.output_path.exists());
        assert!(saved_state(&config).is_none());
        assert!(dataset.page_requests().is_empty());
    }

    #[tokio::test]
    async fn abort_after_progress_stays_resumable() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        let dataset = MockDataset::with_records(100).fail_transiently_at(20, usize::MAX);
        run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        let report = run_once(&config, &dataset, LimitDecision::Abort).await;

        assert_eq!(report.outcome, RunOutcome::Aborted);
        assert_eq!(report.offset, 20);
        assert!(report.is_resumable());
        assert_eq!(saved_state(&config).unwrap()["offset"], 20);
    }

    #[tokio::test]
    async fn corrupt_state_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        std::fs::write(&config.output_path, "[{\"id\":0}").unwrap();
        std::fs::write(&config.state_path, "not json").unwrap();
        let dataset = MockDataset::with_records(15);

        let report = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        assert_eq!(report.start_offset, 0);
        assert_eq!(report.outcome, RunOutcome::Completed);
        let values: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
        assert_eq!(values.len(), 15);
    }

    #[tokio::test]
    async fn missing_output_file_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 10);
        std::fs::write(
            &config.state_path,
            r#"{"schema_version": 1, "offset": 40, "limit_bytes": null}"#,
        )
        .unwrap();
        let dataset = MockDataset::with_records(15);

        let report = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        assert_eq!(report.start_offset, 0);
        assert_eq!(report.offset, 15);
        assert_eq!(dataset.page_requests()[0], (0, 10));
    }

    #[tokio::test]
    async fn uncommitted_tail_is_discarded_on_resume() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, 5);
        let dataset = MockDataset::with_records(12).fail_transiently_at(5, usize::MAX);
        run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;
        // Simulate a kill after a chunk reached the disk but before its offset was saved.
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&config.output_path)
                .unwrap();
            file.write_all(b",{\"id\":5,\"name\":\"row-000000005\"},{\"id\":6")
                .unwrap();
        }

        let dataset = MockDataset::with_records(12);
        let report = run_once(&config, &dataset, LimitDecision::ResumeAsIs).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        let values: Vec<Value> =
            serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
        assert_eq!(ids(&values), (0..12).collect::<Vec<_>>());
    }
}
