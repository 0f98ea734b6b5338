//! Append-only JSONL audit log of committed ledger events.
//!
//! Two ways in:
//! - [`AuditLog::append`] writes a batch (the CLI appends the events one
//!   command committed).
//! - [`spawn_audit_writer`] follows a live `broadcast` subscription until the
//!   ledger is dropped.
//!
//! One line per [`SequencedEvent`]. Correctness of the ledger never depends on
//! the audit log; a lagging writer records the gap and keeps going.

use std::path::{Path, PathBuf};

use reputation_state::SequencedEvent;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ReputationError, Result};
use crate::obs;

/// JSONL file the audit events are appended to.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<fs::File> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ReputationError::Audit(format!("{}: {}", self.path.display(), e)))
    }

    /// Append `events` in order, one JSON object per line.
    pub async fn append(&self, events: &[SequencedEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::new();
        for event in events {
            serde_json::to_writer(&mut buf, event)?;
            buf.push(b'\n');
        }
        let mut file = self.open().await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        debug!(path = %self.path.display(), count = events.len(), "audit events appended");
        Ok(())
    }

    /// Read every recorded event back, in file order.
    pub async fn read_all(&self) -> Result<Vec<SequencedEvent>> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(ReputationError::from))
            .collect()
    }
}

/// Follow `events` and append each one to `log`.
///
/// The task ends when the sending ledger is dropped and resolves to the
/// number of events written.
pub fn spawn_audit_writer(
    log: AuditLog,
    mut events: broadcast::Receiver<SequencedEvent>,
) -> JoinHandle<Result<u64>> {
    tokio::spawn(async move {
        let mut file = log.open().await?;
        let mut written = 0u64;
        loop {
            match events.recv().await {
                Ok(event) => {
                    let mut line = serde_json::to_vec(&event)?;
                    line.push(b'\n');
                    file.write_all(&line).await?;
                    written += 1;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    obs::emit_audit_lagged(skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        file.flush().await?;
        debug!(path = %log.path().display(), written, "audit writer stopped");
        Ok::<_, ReputationError>(written)
    })
}
