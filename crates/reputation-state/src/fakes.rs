//! In-memory fakes (testing only)
//!
//! Provides `MemorySnapshotStore`, which satisfies the [`SnapshotStore`]
//! contract without touching the filesystem, and counts saves so tests can
//! assert when persistence happened.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::snapshot_store::SnapshotStore;
use crate::state::LedgerSnapshot;
use crate::LedgerResult;

/// In-memory snapshot store holding at most one snapshot.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshot: Mutex<Option<LedgerSnapshot>>,
    saves: AtomicU64,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>> {
        let snapshot = self.snapshot.lock().unwrap();
        Ok(snapshot.clone())
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> LedgerResult<()> {
        let mut slot = self.snapshot.lock().unwrap();
        *slot = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
