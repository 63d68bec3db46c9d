use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

const STATE_SCHEMA_VERSION: u32 = 1;

/// Progress of one dataset download. The only thing persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadState {
    /// Records durably written to the output file.
    pub offset: u64,
    /// Operator byte budget; `None` means unlimited.
    pub limit_bytes: Option<u64>,
    /// Output file length when `offset` was committed. Anything past it on
    /// disk belongs to a chunk that never got committed.
    pub committed_bytes: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    schema_version: u32,
    offset: u64,
    #[serde(default)]
    limit_bytes: Option<u64>,
    #[serde(default)]
    committed_bytes: Option<u64>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Resume file stored as pretty JSON next to the output.
#[derive(Debug, Clone)]
pub struct ResumeStateStore {
    path: PathBuf,
}

impl ResumeStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the saved state. A missing, unreadable or unparseable file is a
    /// fresh start, never an error.
    pub async fn load(&self) -> DownloadState {
        match self.try_load().await {
            Ok(Some(state)) => state,
            Ok(None) => DownloadState::default(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %format!("{err:#}"),
                    "ignoring unreadable resume state; starting from offset 0"
                );
                DownloadState::default()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<DownloadState>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        let file: StateFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        if file.schema_version != STATE_SCHEMA_VERSION {
            return Err(anyhow!(
                "unsupported schema_version {} (expected {STATE_SCHEMA_VERSION})",
                file.schema_version
            ));
        }
        Ok(Some(DownloadState {
            offset: file.offset,
            limit_bytes: file.limit_bytes,
            committed_bytes: file.committed_bytes,
        }))
    }

    /// Replaces the saved state: temp file, fsync, rename.
    pub async fn save(&self, state: &DownloadState) -> Result<()> {
        let record = StateFile {
            schema_version: STATE_SCHEMA_VERSION,
            offset: state.offset,
            limit_bytes: state.limit_bytes,
            committed_bytes: state.committed_bytes,
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        let bytes = serde_json::to_vec_pretty(&record).context("failed to serialize resume state")?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("failed to sync {}", tmp.display()))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await.with_context(|| {
            format!(
                "failed to move temporary file {} to {}",
                tmp.display(),
                self.path.display()
            )
        })
    }

    /// Deletes the saved state once the download is complete.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}
