use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

mod args;
mod env;
mod http;
mod pull;
mod ui;
mod utils;

use crate::args::CLIArgs;

#[derive(Debug, Parser)]
#[command(
    name = "soda-pull",
    about = "Resumable download of a paginated open-data dataset into one JSON array",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download the dataset, resuming from saved progress when present
    Pull(CLIArgs<pull::PullArgs>),
    /// Show saved progress for an output file
    Status(CLIArgs<pull::StatusArgs>),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    env::bootstrap_from_args(&argv)?;
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Pull(cmd) => {
            init_tracing(cmd.base.verbose);
            pull::run(cmd.base, cmd.args).await?
        }
        Commands::Status(cmd) => {
            init_tracing(cmd.base.verbose);
            pull::run_status(cmd.base, cmd.args).await?
        }
    }

    Ok(())
}
