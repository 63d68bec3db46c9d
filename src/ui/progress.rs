use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::pull::estimate::{eta_seconds, ProgressUpdate};
use crate::pull::ProgressSink;
use crate::utils::{format_bytes, format_eta};

const CHECKPOINT_HINT: &str = "Ctrl+C checkpoints after the current page; rerun the same command to resume.";

#[derive(Debug, Clone, Copy)]
struct Baseline {
    offset: u64,
    bytes: u64,
    at: Instant,
}

/// Bounded record bar plus a status line for the checkpoint hint and retries.
pub struct PullProgress {
    _multi: Option<MultiProgress>,
    main: ProgressBar,
    status_line: ProgressBar,
    baseline: Mutex<Option<Baseline>>,
}

impl PullProgress {
    /// Hidden unless stderr is a terminal.
    pub fn new(show: bool) -> Self {
        if !show || !std::io::stderr().is_terminal() {
            return Self::hidden();
        }

        let multi = MultiProgress::new();
        let main = multi.add(ProgressBar::new(0));
        main.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix} [{bar:40.cyan/blue}] {human_pos}/{human_len} records ({percent:>3}%) | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        main.set_prefix("Downloading");
        main.enable_steady_tick(Duration::from_millis(80));

        let status_line = multi.add(ProgressBar::new_spinner());
        status_line.set_style(
            ProgressStyle::with_template("  {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status_line.set_message(CHECKPOINT_HINT);
        status_line.enable_steady_tick(Duration::from_millis(300));

        Self {
            _multi: Some(multi),
            main,
            status_line,
            baseline: Mutex::new(None),
        }
    }

    pub fn hidden() -> Self {
        Self {
            _multi: None,
            main: ProgressBar::hidden(),
            status_line: ProgressBar::hidden(),
            baseline: Mutex::new(None),
        }
    }
}

impl ProgressSink for PullProgress {
    fn report(&self, update: &ProgressUpdate) {
        let baseline = {
            let mut guard = match self.baseline.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard.get_or_insert(Baseline {
                offset: update.offset,
                bytes: update.bytes_downloaded,
                at: Instant::now(),
            })
        };

        self.main.set_length(update.total_records);
        self.main.set_position(update.offset);
        self.main.set_message(progress_message(update, &baseline));

        if update.retries > 0 {
            self.status_line.set_message(format!(
                "{CHECKPOINT_HINT}  Retries: {}",
                update.retries
            ));
        }
    }

    fn finish(&self) {
        self.status_line.finish_and_clear();
        self.main.finish_and_clear();
    }
}

fn progress_message(update: &ProgressUpdate, baseline: &Baseline) -> String {
    let elapsed = baseline.at.elapsed().as_secs_f64().max(1.0);
    let records_this_run = update.offset.saturating_sub(baseline.offset);
    let bytes_this_run = update.bytes_downloaded.saturating_sub(baseline.bytes);
    let remaining = update.total_records.saturating_sub(update.offset);
    format!(
        "{} of ~{} | {}/s | ETA {}",
        format_bytes(update.bytes_downloaded as f64),
        format_bytes(update.estimated_total_bytes as f64),
        format_bytes(bytes_this_run as f64 / elapsed),
        format_eta(eta_seconds(records_this_run, elapsed, remaining)),
    )
}
