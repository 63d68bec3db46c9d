use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Args)]
pub struct BaseArgs {
    /// Output as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// Dataset resource URL, e.g. https://data.example.gov/resource/abcd-1234.json (or via SODA_DATASET_URL)
    #[arg(long, env = "SODA_DATASET_URL", global = true)]
    pub dataset_url: Option<String>,

    /// Application token sent as X-App-Token (or via SODA_APP_TOKEN)
    #[arg(long, env = "SODA_APP_TOKEN", hide_env_values = true, global = true)]
    pub app_token: Option<String>,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "SODA_ENV_FILE", hide_env_values = true)]
    pub env_file: Option<PathBuf>,

    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
