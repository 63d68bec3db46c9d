use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Confirm;
use serde_json::json;

use crate::args::BaseArgs;
use crate::http::DatasetClient;
use crate::ui::{
    is_interactive, print_command_status, print_hint, CommandStatus, InteractiveLimitPrompt,
    PullProgress,
};
use crate::utils::{format_bytes, format_commas, format_duration, parse_byte_size, pluralize};

pub mod config;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod fetch;
pub mod limit;
pub mod size;
pub mod source;
pub mod state;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

use self::config::{
    default_state_path, EngineConfig, PullConfig, RetryPolicy, SourceConfig,
    DEFAULT_COUNT_TIMEOUT_SECS, DEFAULT_FALLBACK_TOTAL, DEFAULT_MAX_ATTEMPTS, DEFAULT_ORDER_KEY,
    DEFAULT_OUTPUT_PATH, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_DELAY_SECS,
};
pub use self::engine::{Downloader, PauseReason, ProgressSink, RunOutcome, RunReport};
use self::limit::{FixedDecision, LimitDecision, LimitNegotiator};
use self::size::TotalSource;
use self::state::ResumeStateStore;

#[derive(Debug, Clone, Args)]
pub struct PullArgs {
    #[command(flatten)]
    files: FileArgs,

    /// Records requested per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    page_size: u64,

    /// Column used to keep pagination stable across requests.
    #[arg(long, default_value = DEFAULT_ORDER_KEY)]
    order_by: String,

    /// Cap the output at this many bytes (e.g. 500MB, 2GB). Replaces any saved limit.
    #[arg(long, value_parser = parse_byte_size, conflicts_with_all = ["extend_bytes", "unlimited"])]
    limit_bytes: Option<u64>,

    /// Add this many bytes to the saved limit.
    #[arg(long, value_parser = parse_byte_size, conflicts_with = "unlimited")]
    extend_bytes: Option<u64>,

    /// Drop any saved limit and download everything.
    #[arg(long)]
    unlimited: bool,

    /// Ignore saved progress and recreate the output from the first record.
    #[arg(long)]
    fresh: bool,

    /// Never prompt; keep the saved limit (or none) unless a limit flag is given.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Attempts per page before the run stops as failed.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: usize,

    /// Pause between attempts.
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_SECS)]
    retry_delay_secs: u64,

    /// Timeout for a single page request.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    /// Timeout for the record count query.
    #[arg(long, default_value_t = DEFAULT_COUNT_TIMEOUT_SECS)]
    count_timeout_secs: u64,

    /// Record count assumed when the count query fails.
    #[arg(long, default_value_t = DEFAULT_FALLBACK_TOTAL)]
    fallback_total: u64,
}

#[derive(Debug, Clone, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    files: FileArgs,
}

#[derive(Debug, Clone, Args)]
struct FileArgs {
    /// Output JSON file.
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Resume state file [default: <output>.state.json]
    #[arg(long)]
    state: Option<PathBuf>,
}

impl FileArgs {
    fn state_path(&self) -> PathBuf {
        self.state
            .clone()
            .unwrap_or_else(|| default_state_path(&self.output))
    }
}

impl PullArgs {
    fn decision_override(&self) -> Option<LimitDecision> {
        if self.unlimited {
            Some(LimitDecision::Unlimited)
        } else if let Some(bytes) = self.limit_bytes {
            Some(LimitDecision::Replace(bytes))
        } else {
            self.extend_bytes.map(LimitDecision::Extend)
        }
    }
}

fn build_config(base: &BaseArgs, args: &PullArgs) -> Result<PullConfig> {
    let dataset_url = base
        .dataset_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .context("--dataset-url is required (or set SODA_DATASET_URL)")?;

    Ok(PullConfig {
        source: SourceConfig {
            dataset_url,
            app_token: base.app_token.clone(),
            order_key: args.order_by.clone(),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        },
        engine: EngineConfig {
            output_path: args.files.output.clone(),
            state_path: args.files.state_path(),
            page_size: args.page_size,
            retry: RetryPolicy::fixed(
                args.max_attempts,
                Duration::from_secs(args.retry_delay_secs),
            ),
            count_timeout: Duration::from_secs(args.count_timeout_secs),
            fallback_total: args.fallback_total,
        },
    })
}

pub async fn run(base: BaseArgs, args: PullArgs) -> Result<()> {
    let config = build_config(&base, &args)?;
    let engine = &config.engine;
    let store = ResumeStateStore::new(&engine.state_path);

    if args.fresh {
        store.clear().await?;
    } else if !store.exists() && has_content(&engine.output_path) {
        confirm_overwrite(&engine.output_path, args.yes)?;
    }
    create_parent_dir(&engine.output_path)?;
    create_parent_dir(&engine.state_path)?;

    let client = DatasetClient::new(&config.source)?;
    let negotiator: Box<dyn LimitNegotiator> = match args.decision_override() {
        Some(decision) => Box::new(FixedDecision(decision)),
        None if args.yes || base.json || !is_interactive() => {
            Box::new(FixedDecision(LimitDecision::ResumeAsIs))
        }
        None => Box::new(InteractiveLimitPrompt),
    };
    let progress = PullProgress::new(!base.json);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    let ctrlc_task = tokio::spawn(async move {
        if escalate_interrupts(&interrupted_signal, tokio::signal::ctrl_c).await {
            print_command_status(
                CommandStatus::Paused,
                "Stopped; rerun the same command to resume from the last saved page",
            );
            std::process::exit(130);
        }
    });

    tracing::debug!(url = %client.url(), output = %engine.output_path.display(), "starting pull");
    let result = Downloader::new(engine, &client, negotiator.as_ref(), &progress)
        .with_interrupt_flag(interrupted)
        .run()
        .await;
    ctrlc_task.abort();
    let report = result?;

    if base.json {
        print_json_summary(&config, &report)?;
    } else {
        print_summary(&config, &report);
    }

    match &report.outcome {
        RunOutcome::Failed { reason } => bail!(
            "download failed at offset {}: {reason}",
            report.offset
        ),
        _ => Ok(()),
    }
}

/// Raises `interrupted` on the first signal so the run pauses at the next
/// page boundary. Returns true if a second signal asks to stop right away;
/// every committed page is already checkpointed by then.
async fn escalate_interrupts<F, Fut>(interrupted: &AtomicBool, mut next_signal: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    interrupted.store(true, Ordering::SeqCst);
    print_hint("Stopping after the current page. Press Ctrl+C again to stop now.");
    next_signal().await.is_ok()
}

fn has_content(path: &Path) -> bool {
    path.metadata().map(|meta| meta.len() > 0).unwrap_or(false)
}

fn confirm_overwrite(output: &Path, assume_yes: bool) -> Result<()> {
    if !assume_yes && is_interactive() {
        let overwrite = Confirm::new()
            .with_prompt(format!(
                "{} exists and no download is in progress. Download again from scratch?",
                output.display()
            ))
            .default(false)
            .interact()?;
        if overwrite {
            return Ok(());
        }
    }
    bail!(
        "{} already exists and has no resume state; pass --fresh to download it again",
        output.display()
    )
}

fn create_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display())),
        _ => Ok(()),
    }
}

fn outcome_label(outcome: &RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Paused(PauseReason::LimitReached { .. }) => "limit_reached",
        RunOutcome::Paused(PauseReason::Interrupted) => "interrupted",
        RunOutcome::Failed { .. } => "failed",
        RunOutcome::Aborted => "aborted",
    }
}

fn print_json_summary(config: &PullConfig, report: &RunReport) -> Result<()> {
    let reason = match &report.outcome {
        RunOutcome::Failed { reason } => Some(reason.clone()),
        _ => None,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "status": outcome_label(&report.outcome),
            "output_path": config.engine.output_path,
            "state_path": config.engine.state_path,
            "resumable": report.is_resumable(),
            "start_offset": report.start_offset,
            "offset": report.offset,
            "bytes_written": report.bytes_downloaded,
            "limit_bytes": report.budget.and_then(|b| b.limit()),
            "total_records": report.total.map(|t| t.records),
            "total_is_estimate": report.total.map(|t| t.source == TotalSource::Fallback),
            "pages": report.pages,
            "retries": report.retries,
            "elapsed_secs": report.elapsed.as_secs_f64(),
            "error": reason,
        }))?
    );
    Ok(())
}

fn print_summary(config: &PullConfig, report: &RunReport) {
    let output = config.engine.output_path.display();
    match &report.outcome {
        RunOutcome::Completed => print_command_status(CommandStatus::Success, "Download complete"),
        RunOutcome::Paused(PauseReason::LimitReached { limit }) => print_command_status(
            CommandStatus::Paused,
            &format!("Paused: byte limit of {} reached", format_bytes(*limit as f64)),
        ),
        RunOutcome::Paused(PauseReason::Interrupted) => {
            print_command_status(CommandStatus::Paused, "Paused: interrupted")
        }
        RunOutcome::Failed { reason } => {
            print_command_status(CommandStatus::Error, &format!("Download failed: {reason}"))
        }
        RunOutcome::Aborted => {
            print_command_status(CommandStatus::Warning, "Aborted; nothing was downloaded")
        }
    }

    let fetched = report.offset.saturating_sub(report.start_offset);
    let elapsed_secs = report.elapsed.as_secs().max(1);
    eprintln!("  Output: {output}");
    eprintln!("  Time: {}", format_duration(report.elapsed.as_secs()));
    eprintln!(
        "  Records: {} ({} this run)",
        format_commas(report.offset),
        format_commas(fetched)
    );
    if let Some(total) = report.total {
        let suffix = match total.source {
            TotalSource::Remote => "",
            TotalSource::Fallback => " (approximate; count query failed)",
        };
        eprintln!("  Dataset: {} records{suffix}", format_commas(total.records));
    }
    eprintln!(
        "  Data: {} ({} bytes)",
        format_bytes(report.bytes_downloaded as f64),
        format_commas(report.bytes_downloaded)
    );
    eprintln!(
        "  Pages: {} | {:.2} records/s",
        format_commas(report.pages),
        fetched as f64 / elapsed_secs as f64
    );
    if report.retries > 0 {
        eprintln!(
            "  Retried: {} {}",
            report.retries,
            pluralize(report.retries as u64, "time", None)
        );
    }

    if report.is_resumable() && report.outcome != RunOutcome::Aborted {
        print_hint(&format!(
            "{output} is incomplete (no closing bracket). Resume from record {} by rerunning the same command.",
            format_commas(report.offset)
        ));
        if let RunOutcome::Paused(PauseReason::LimitReached { .. }) = report.outcome {
            print_hint("Add --extend-bytes <SIZE> or --unlimited to download more.");
        }
    }
}

pub async fn run_status(base: BaseArgs, args: StatusArgs) -> Result<()> {
    let output = &args.files.output;
    let store = ResumeStateStore::new(args.files.state_path());
    let resume_pending = store.exists();
    let state = store.load().await;
    let bytes_on_disk = output.metadata().ok().map(|meta| meta.len());
    let complete = !resume_pending && output_is_closed(output)?;

    let status = if complete {
        "complete"
    } else if resume_pending {
        "in_progress"
    } else if bytes_on_disk.is_some() {
        "unknown"
    } else {
        "not_started"
    };

    if base.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "status": status,
                "output_path": output,
                "state_path": store.path(),
                "output_bytes": bytes_on_disk,
                "offset": resume_pending.then_some(state.offset),
                "limit_bytes": state.limit_bytes,
            }))?
        );
        return Ok(());
    }

    println!("Output: {}", output.display());
    match bytes_on_disk {
        Some(bytes) => println!("Size: {} ({} bytes)", format_bytes(bytes as f64), format_commas(bytes)),
        None => println!("Size: (missing)"),
    }
    match status {
        "complete" => println!("Status: complete"),
        "in_progress" => {
            println!("Status: in progress (resume from record {})", format_commas(state.offset));
            match state.limit_bytes {
                Some(limit) => println!("Limit: {}", format_bytes(limit as f64)),
                None => println!("Limit: none"),
            }
        }
        "unknown" => println!("Status: no resume state; file is not a closed JSON array"),
        _ => println!("Status: not started"),
    }
    Ok(())
}

/// True when the file's last non-whitespace byte is `]`.
fn output_is_closed(path: &Path) -> Result<bool> {
    use std::io::{Read, Seek, SeekFrom};

    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err).with_context(|| format!("failed to open {}", path.display())),
    };
    let len = file
        .metadata()
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    let tail_len = len.min(64);
    file.seek(SeekFrom::End(-(tail_len as i64)))
        .with_context(|| format!("failed to seek {}", path.display()))?;
    let mut tail = Vec::with_capacity(tail_len as usize);
    file.read_to_end(&mut tail)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(tail
        .iter()
        .rev()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b']'))
}
