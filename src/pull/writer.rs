use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::source::Record;

const OUTPUT_BUFFER_BYTES: usize = 1 << 20;

/// Appends records to an on-disk JSON array that stays a valid prefix
/// (everything but the closing `]`) until [`finalize`](Self::finalize) is
/// called with `reached_end = true`.
pub struct JsonArrayWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    bytes_written: u64,
}

impl JsonArrayWriter {
    /// Truncates or creates the file and opens the array.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        let mut writer = Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(OUTPUT_BUFFER_BYTES, file),
            bytes_written: 0,
        };
        writer.write_bytes(b"[").await?;
        Ok(writer)
    }

    /// Reopens an in-progress array for appending, cutting off anything past
    /// `committed_len` first.
    pub async fn resume(path: &Path, committed_len: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open output file {}", path.display()))?;
        let on_disk = file
            .metadata()
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        if on_disk > committed_len {
            tracing::warn!(
                path = %path.display(),
                discarded_bytes = on_disk - committed_len,
                "discarding bytes from a chunk that was never committed"
            );
            file.set_len(committed_len)
                .await
                .with_context(|| format!("failed to truncate {}", path.display()))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::with_capacity(OUTPUT_BUFFER_BYTES, file),
            bytes_written: committed_len.min(on_disk),
        })
    }

    /// File length including bytes still sitting in the buffer.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes `records` as comma-separated JSON values. A leading comma is
    /// emitted unless this is the very first chunk of the whole download.
    /// Returns the number of bytes appended.
    pub async fn append_chunk(&mut self, records: &[Record], first_chunk: bool) -> Result<u64> {
        let before = self.bytes_written;
        for (idx, record) in records.iter().enumerate() {
            if idx > 0 || !first_chunk {
                self.write_bytes(b",").await?;
            }
            self.write_bytes(record.get().as_bytes()).await?;
        }
        Ok(self.bytes_written - before)
    }

    /// Pushes buffered bytes to the OS and waits until they are on disk.
    pub async fn sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        self.writer
            .get_ref()
            .sync_data()
            .await
            .with_context(|| format!("failed to sync {}", self.path.display()))
    }

    /// Closes the array only when the dataset was exhausted; otherwise leaves
    /// the valid prefix in place for the next run. Returns the final length.
    pub async fn finalize(mut self, reached_end: bool) -> Result<u64> {
        if reached_end {
            self.write_bytes(b"]").await?;
        }
        self.sync().await?;
        self.writer
            .shutdown()
            .await
            .with_context(|| format!("failed to close {}", self.path.display()))?;
        Ok(self.bytes_written)
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        // Awaiting the buffered write is the drain point when the disk falls behind.
        self.writer
            .write_all(bytes)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}
