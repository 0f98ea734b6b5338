//! Persistent ledger sessions.
//!
//! A session loads the ledger from a [`SnapshotStore`], hands out a
//! [`ReputationService`] over it, and on `commit` saves a fresh snapshot and
//! appends the newly committed events to the audit log. Nothing is written
//! when no event was committed since the last save.

use std::sync::Arc;

use reputation_state::{FsSnapshotStore, Ledger, LedgerState, SnapshotStore};
use tracing::{debug, info};

use crate::audit::AuditLog;
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::service::ReputationService;

/// Ledger bound to a snapshot store.
pub struct LedgerSession<S: SnapshotStore = FsSnapshotStore> {
    store: S,
    service: ReputationService,
    audit: Option<AuditLog>,
    committed_seq: u64,
}

impl LedgerSession<FsSnapshotStore> {
    /// Open the snapshot file named by `config`, or start empty if it does
    /// not exist yet.
    pub async fn open(config: &LedgerConfig) -> Result<Self> {
        Self::open_with(FsSnapshotStore::new(&config.state_path), config).await
    }
}

impl<S: SnapshotStore> LedgerSession<S> {
    pub async fn open_with(store: S, config: &LedgerConfig) -> Result<Self> {
        config.validate()?;
        let ledger = match store.load().await? {
            Some(snapshot) => Ledger::from_snapshot(snapshot, config.event_capacity)?,
            None => {
                debug!("starting with an empty ledger");
                Ledger::with_state(LedgerState::new(), config.event_capacity)
            }
        };
        let committed_seq = ledger.last_seq().await;

        Ok(Self {
            store,
            service: ReputationService::new(Arc::new(ledger)),
            audit: config.audit_log.as_ref().map(AuditLog::new),
            committed_seq,
        })
    }

    pub fn service(&self) -> &ReputationService {
        &self.service
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        self.service.ledger()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether events were committed since the session was opened or last
    /// committed.
    pub async fn is_dirty(&self) -> bool {
        self.ledger().last_seq().await != self.committed_seq
    }

    /// Save if anything changed. Returns whether a snapshot was written.
    pub async fn commit(&mut self) -> Result<bool> {
        let snapshot = self.ledger().snapshot().await;
        let last_seq = snapshot.events.last().map(|e| e.seq).unwrap_or(0);
        if last_seq == self.committed_seq {
            debug!(seq = last_seq, "nothing to commit");
            return Ok(false);
        }

        self.store.save(&snapshot).await?;
        if let Some(audit) = &self.audit {
            let fresh: Vec<_> = snapshot
                .events
                .iter()
                .filter(|e| e.seq > self.committed_seq)
                .cloned()
                .collect();
            audit.append(&fresh).await?;
        }

        info!(from_seq = self.committed_seq, to_seq = last_seq, "ledger committed");
        self.committed_seq = last_seq;
        Ok(true)
    }
}
