//! Newline-delimited JSON log backed by a single file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{next_stamp, LogStats, TelemetryLog};
use crate::error::{Error, Result};
use crate::record::{Event, TelemetryRecord};

/// Append-only NDJSON telemetry log.
///
/// The file is created on the first append. A single mutex guards the
/// append handle and is also held for the duration of every scan, so
/// readers never see a line that is still being written.
#[derive(Debug)]
pub struct FileLog {
    /// Path to the log file.
    path: PathBuf,
    /// Writer state, guarded by the log lock.
    writer: Mutex<WriterState>,
}

#[derive(Debug, Default)]
struct WriterState {
    /// Append handle, opened lazily.
    file: Option<File>,
    /// Timestamp of the newest record in the file.
    last_stamp: Option<DateTime<Utc>>,
}

impl FileLog {
    /// Create a log over the file at `path`.
    ///
    /// Nothing is touched on disk until the first append.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: Mutex::new(WriterState::default()),
        }
    }

    /// Get the path to the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the append handle, creating parent directories and the file.
    async fn open_for_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::DirectoryCreate {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|source| Error::LogOpen {
                path: self.path.clone(),
                source,
            })?;

        info!("Telemetry log opened for append at {}", self.path.display());
        Ok(file)
    }

    /// Make the end of an existing log safe to append to.
    ///
    /// A process that died mid-write can leave bytes after the last newline.
    /// If they still decode as a record the line is terminated; otherwise
    /// they are cut off. Returns the timestamp of the last record.
    async fn recover_tail(&self, file: &mut File) -> Result<Option<DateTime<Utc>>> {
        let Some(bytes) = self.read_contents().await? else {
            return Ok(None);
        };

        let mut end = bytes.len();
        if !bytes.is_empty() && !bytes.ends_with(b"\n") {
            let start = bytes
                .iter()
                .rposition(|b| *b == b'\n')
                .map_or(0, |idx| idx + 1);

            if parse_record(&bytes[start..]).is_ok() {
                warn!(
                    "Terminating unfinished last line of {}",
                    self.path.display()
                );
                file.write_all(b"\n").await?;
                file.flush().await?;
            } else {
                warn!(
                    "Discarding {} byte torn tail of {}",
                    bytes.len() - start,
                    self.path.display()
                );
                let keep = u64::try_from(start).unwrap_or(u64::MAX);
                file.set_len(keep).await?;
                end = start;
            }
            file.sync_data().await?;
        }

        let complete = bytes[..end].strip_suffix(b"\n").unwrap_or(&bytes[..end]);
        let last_stamp = complete
            .rsplit(|b| *b == b'\n')
            .next()
            .and_then(|line| parse_record(line).ok())
            .and_then(|record| record.timestamp());
        Ok(last_stamp)
    }

    /// Write one complete line and sync it to stable storage.
    ///
    /// On failure the file is cut back to its previous length so that a
    /// torn line never survives.
    async fn write_line(file: &mut File, line: &[u8]) -> Result<()> {
        let len_before = file.metadata().await?.len();

        let written = async {
            file.write_all(line).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(err) = written {
            Self::roll_back(file, len_before).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Truncate the file to `len`, logging rather than failing.
    async fn roll_back(file: &mut File, len: u64) {
        match file.set_len(len).await {
            Ok(()) => warn!("Rolled back partial telemetry line to {} bytes", len),
            Err(err) => warn!("Failed to roll back partial telemetry line: {}", err),
        }
    }

    /// Read the raw file contents, treating a missing file as empty.
    async fn read_contents(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::LogOpen {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[async_trait]
impl TelemetryLog for FileLog {
    async fn append(&self, event: Event) -> Result<TelemetryRecord> {
        let mut state = self.writer.lock().await;

        let mut file = match state.file.take() {
            Some(file) => file,
            None => {
                let mut file = self.open_for_append().await?;
                let tail_stamp = self.recover_tail(&mut file).await?;
                state.last_stamp = state.last_stamp.max(tail_stamp);
                file
            }
        };

        let stamp = next_stamp(state.last_stamp);
        let record = event.stamp(stamp);
        let mut line = record.to_line()?.into_bytes();
        line.push(b'\n');

        // The handle is dropped on failure and reopened by the next append.
        Self::write_line(&mut file, &line).await?;
        state.file = Some(file);
        state.last_stamp = Some(stamp);

        debug!(
            "Appended {} byte telemetry record at {}",
            line.len(),
            record.timestamp_str().unwrap_or_default()
        );
        Ok(record)
    }

    async fn scan_all(&self) -> Result<Vec<TelemetryRecord>> {
        let _guard = self.writer.lock().await;

        match self.read_contents().await? {
            Some(bytes) => decode_lines(&bytes),
            None => {
                debug!("Telemetry log {} does not exist yet", self.path.display());
                Ok(Vec::new())
            }
        }
    }

    async fn stats(&self) -> Result<LogStats> {
        let _guard = self.writer.lock().await;

        let Some(bytes) = self.read_contents().await? else {
            return Ok(LogStats::default());
        };
        let records = decode_lines(&bytes)?;
        let size_bytes = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        Ok(LogStats::from_records(&records, size_bytes))
    }
}

/// Decode NDJSON bytes into records, failing on the first bad line.
fn decode_lines(bytes: &[u8]) -> Result<Vec<TelemetryRecord>> {
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    body.split(|b| *b == b'\n')
        .enumerate()
        .map(|(idx, line)| {
            parse_record(line).map_err(|source| Error::Decode {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

/// Parse one stored line. A record without a server timestamp is rejected.
fn parse_record(line: &[u8]) -> std::result::Result<TelemetryRecord, serde_json::Error> {
    let record: TelemetryRecord = serde_json::from_slice(line)?;
    if record.timestamp().is_none() {
        return Err(serde_json::Error::custom(
            "record has no valid `timestamp` field",
        ));
    }
    Ok(record)
}
