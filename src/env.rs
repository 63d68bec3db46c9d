use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Loads `.env` files before clap parses, so `env = "SODA_*"` defaults see them.
pub fn bootstrap_from_args(args: &[OsString]) -> Result<()> {
    let explicit = env_file_arg(args).or_else(|| std::env::var_os("SODA_ENV_FILE").map(PathBuf::from));
    load_env(explicit.as_deref())
}

/// Variables already present in the process environment always win. Among
/// files, `.env.local` overrides `.env`.
pub fn load_env(explicit_env_file: Option<&Path>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let mut pending: Vec<(String, String)> = Vec::new();

    for env_file in candidate_files(&cwd, explicit_env_file) {
        if explicit_env_file.is_none() && !env_file.exists() {
            continue;
        }
        let entries = dotenvy::from_path_iter(&env_file)
            .with_context(|| format!("failed to read env file {}", env_file.display()))?;
        for entry in entries {
            let (key, value) =
                entry.with_context(|| format!("failed to parse env file {}", env_file.display()))?;
            if std::env::var_os(&key).is_some() {
                continue;
            }
            pending.retain(|(existing, _)| existing != &key);
            pending.push((key, value));
        }
    }

    for (key, value) in pending {
        std::env::set_var(key, value);
    }
    Ok(())
}

fn env_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut found = None;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let Some(arg) = arg.to_str() else {
            continue;
        };
        if arg == "--" {
            break;
        }
        if arg == "--env-file" {
            found = iter.next().map(PathBuf::from);
        } else if let Some(value) = arg.strip_prefix("--env-file=") {
            found = Some(PathBuf::from(value));
        }
    }
    found
}

fn candidate_files(cwd: &Path, explicit: Option<&Path>) -> Vec<PathBuf> {
    match explicit {
        Some(path) if path.is_absolute() => vec![path.to_path_buf()],
        Some(path) => vec![cwd.join(path)],
        None => vec![cwd.join(".env"), cwd.join(".env.local")],
    }
}
