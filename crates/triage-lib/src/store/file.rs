//! File-backed key-value store
//!
//! Every `put` appends one JSON line `{"key": ..., "record": ...}` to the log
//! and only then updates the in-memory view, so `get` never returns a record
//! that did not reach the file. On open the log is replayed and the last line
//! for a key wins. A torn or corrupt line is skipped.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{InMemoryStore, KeyValueStore};
use crate::error::{Result, TriageError};

/// One line of the log
#[derive(Serialize, Deserialize)]
struct LogLine {
    key: String,
    record: Value,
}

/// Key-value store persisted as an append-only JSON-lines log
pub struct JsonFileStore {
    path: PathBuf,
    records: InMemoryStore,
    /// Serializes appends; holds true while the log ends in a torn line
    needs_newline: Mutex<bool>,
}

impl JsonFileStore {
    /// Open a store at `path`, replaying an existing log if present
    ///
    /// An unreadable log is logged and the store starts empty.
    pub async fn open(table: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = InMemoryStore::new(table);
        let mut torn_tail = false;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            match replay(&path, &records).await {
                Ok((skipped, torn)) => {
                    torn_tail = torn;
                    info!(
                        path = %path.display(),
                        entries = records.len(),
                        skipped_lines = skipped,
                        "Replayed store log"
                    );
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read store log, starting empty");
                }
            }
        }

        Self {
            path,
            records,
            needs_newline: Mutex::new(torn_tail),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    async fn append(&self, line: &LogLine, needs_newline: bool) -> Result<()> {
        let mut bytes = Vec::new();
        if needs_newline {
            bytes.push(b'\n');
        }
        serde_json::to_writer(&mut bytes, line)?;
        bytes.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    TriageError::Storage(format!("failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let write_err =
            |e: std::io::Error| TriageError::Storage(format!("failed to append to {}: {}", self.path.display(), e));

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;
        file.write_all(&bytes).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        file.sync_data().await.map_err(write_err)?;

        debug!(path = %self.path.display(), key = %line.key, "Store log line appended");
        Ok(())
    }
}

/// Load every readable line into `records`
///
/// Returns how many lines were skipped and whether the file ends without a
/// trailing newline.
async fn replay(path: &Path, records: &InMemoryStore) -> Result<(usize, bool)> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TriageError::Storage(format!("failed to read {}: {}", path.display(), e)))?;

    let mut skipped = 0;
    for (number, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<LogLine>(line) {
            Ok(entry) => records.insert(entry.key, entry.record),
            Err(e) => {
                warn!(path = %path.display(), line = number + 1, error = %e, "Skipping unreadable store log line");
                skipped += 1;
            }
        }
    }
    Ok((skipped, !data.is_empty() && !data.ends_with('\n')))
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.records.get(key).await
    }

    async fn put(&self, key: &str, record: Value) -> Result<()> {
        let line = LogLine {
            key: key.to_string(),
            record,
        };

        let mut needs_newline = self.needs_newline.lock().await;
        self.append(&line, *needs_newline).await?;
        *needs_newline = false;
        self.records.insert(line.key, line.record);
        Ok(())
    }
}
