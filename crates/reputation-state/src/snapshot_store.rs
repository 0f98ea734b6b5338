//! Durable snapshot storage.
//!
//! The ledger itself is storage-agnostic; a [`SnapshotStore`] persists and
//! reloads [`LedgerSnapshot`]s. `FsSnapshotStore` keeps one JSON document on
//! disk and replaces it atomically.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::{fs, task};
use tracing::{debug, info};

use crate::error::LedgerError;
use crate::state::LedgerSnapshot;
use crate::LedgerResult;

/// Snapshot persistence backend.
///
/// Guarantees:
/// - `load` returns `None` when nothing was ever saved.
/// - `save` either fully replaces the previous snapshot or leaves it intact.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>>;

    async fn save(&self, snapshot: &LedgerSnapshot) -> LedgerResult<()>;
}

/// JSON file snapshot store.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    path: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `bytes` to a temp file next to `path`, fsync it and rename it over
/// `path`. Blocking; run it off the async workers.
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> LedgerResult<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| LedgerError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot on disk");
                return Ok(None);
            }
            Err(e) => return Err(LedgerError::Io(e)),
        };
        let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
        debug!(path = %self.path.display(), events = snapshot.events.len(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> LedgerResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).await?;

        let json = serde_json::to_vec_pretty(snapshot)?;
        let path = self.path.clone();
        task::spawn_blocking(move || write_atomic(&dir, &path, &json))
            .await
            .map_err(|e| LedgerError::Io(io::Error::new(io::ErrorKind::Other, e)))??;

        info!(
            path = %self.path.display(),
            agents = snapshot.agents.len(),
            feedback = snapshot.feedback.len(),
            validations = snapshot.validations.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LedgerState;
    use crate::types::Address;
    use chrono::Utc;

    #[tokio::test]
    async fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("ledger.json"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("ledger.json");
        let store = FsSnapshotStore::new(&path);

        let mut state = LedgerState::new();
        state
            .register(Address::new([4; 20]), "ipfs://x", vec![], Utc::now())
            .unwrap();
        store.save(&state.snapshot()).await.unwrap();

        assert!(path.exists());
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, state.snapshot());
    }

    #[tokio::test]
    async fn repeated_saves_replace_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = FsSnapshotStore::new(&path);

        let mut state = LedgerState::new();
        store.save(&state.snapshot()).await.unwrap();
        state
            .register(Address::new([4; 20]), "ipfs://x", vec![], Utc::now())
            .unwrap();
        store.save(&state.snapshot()).await.unwrap();

        // the temp file was renamed over the target, nothing else is left behind
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ledger.json")]);
        assert_eq!(store.load().await.unwrap().unwrap(), state.snapshot());
    }

    #[tokio::test]
    async fn malformed_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = FsSnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }
}
