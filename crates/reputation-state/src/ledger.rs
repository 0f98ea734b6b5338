//! Single-writer ledger implementing all three registry traits.
//!
//! One [`LedgerState`] sits behind one `tokio::sync::RwLock`. Each mutating
//! call holds the write lock for its whole duration and never awaits while
//! holding it, so calls are atomic with respect to each other; readers see
//! only committed state. Committed events are broadcast before the write lock
//! is released, so subscribers receive them in sequence order; a lagging
//! subscriber loses events, writers never wait for it.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::events::SequencedEvent;
use crate::registry_traits::{IdentityRegistry, ReputationRegistry, ValidationRegistry};
use crate::schema::{
    AgentRecord, FeedbackBatch, FeedbackEntry, FeedbackFilter, FeedbackInput, FeedbackSummary,
    MetadataEntry, ResponseInput, ValidationRecord, ValidationStatus, ValidationSummary,
};
use crate::state::{LedgerSnapshot, LedgerState};
use crate::types::{AgentId, Address, Hash32};
use crate::LedgerResult;

/// Default broadcast buffer per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Shared handle to the ledger state. Wrap in `Arc` to share between tasks.
pub struct Ledger {
    state: RwLock<LedgerState>,
    events: broadcast::Sender<SequencedEvent>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Empty ledger with the default event buffer.
    pub fn new() -> Self {
        Self::with_state(LedgerState::new(), DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_state(state: LedgerState, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            state: RwLock::new(state),
            events,
        }
    }

    /// Rebuild a ledger from a snapshot after invariant validation.
    pub fn from_snapshot(snapshot: LedgerSnapshot, event_capacity: usize) -> LedgerResult<Self> {
        let state = LedgerState::restore(snapshot)?;
        info!(
            next_agent_id = %state.directory().next_id(),
            events = state.last_seq(),
            "ledger restored from snapshot"
        );
        Ok(Self::with_state(state, event_capacity))
    }

    /// Consistent image of the current committed state.
    pub async fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().await.snapshot()
    }

    /// Subscribe to events committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SequencedEvent> {
        self.events.subscribe()
    }

    /// Journaled events with `seq > after`.
    pub async fn events_since(&self, after: u64) -> Vec<SequencedEvent> {
        self.state.read().await.events_since(after).to_vec()
    }

    pub async fn last_seq(&self) -> u64 {
        self.state.read().await.last_seq()
    }

    /// Read guard for multi-step queries that must see one consistent state.
    pub async fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().await
    }

    fn publish(&self, events: Vec<SequencedEvent>) {
        for event in events {
            debug!(seq = event.seq, event = event.event.name(), "event committed");
            // no subscribers is fine
            let _ = self.events.send(event);
        }
    }
}

#[async_trait]
impl IdentityRegistry for Ledger {
    async fn register(
        &self,
        caller: &Address,
        agent_uri: &str,
        metadata: Vec<MetadataEntry>,
    ) -> LedgerResult<AgentId> {
        let mut state = self.state.write().await;
        let (id, events) = state.register(*caller, agent_uri, metadata, Utc::now())?;
        self.publish(events);
        Ok(id)
    }

    async fn set_agent_uri(
        &self,
        caller: &Address,
        agent_id: AgentId,
        uri: &str,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let events = state.set_agent_uri(*caller, agent_id, uri, Utc::now())?;
        self.publish(events);
        Ok(())
    }

    async fn set_metadata(
        &self,
        caller: &Address,
        agent_id: AgentId,
        key: &str,
        value: Vec<u8>,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let events = state.set_metadata(*caller, agent_id, key, value, Utc::now())?;
        self.publish(events);
        Ok(())
    }

    async fn set_agent_wallet(
        &self,
        caller: &Address,
        agent_id: AgentId,
        wallet: Address,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let events = state.set_agent_wallet(*caller, agent_id, Some(wallet), Utc::now())?;
        self.publish(events);
        Ok(())
    }

    async fn unset_agent_wallet(&self, caller: &Address, agent_id: AgentId) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let events = state.set_agent_wallet(*caller, agent_id, None, Utc::now())?;
        self.publish(events);
        Ok(())
    }

    async fn resolve(&self, agent_id: AgentId) -> LedgerResult<AgentRecord> {
        let state = self.state.read().await;
        state.directory().resolve(agent_id).cloned()
    }

    async fn list_agents(&self) -> LedgerResult<Vec<AgentRecord>> {
        let state = self.state.read().await;
        Ok(state.directory().records().cloned().collect())
    }

    async fn owner_of(&self, agent_id: AgentId) -> LedgerResult<Address> {
        let state = self.state.read().await;
        state.directory().resolve(agent_id).map(|r| r.owner)
    }

    async fn get_metadata(&self, agent_id: AgentId, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let state = self.state.read().await;
        let record = state.directory().resolve(agent_id)?;
        Ok(record.metadata.get(key).cloned())
    }

    async fn get_agent_wallet(&self, agent_id: AgentId) -> LedgerResult<Option<Address>> {
        let state = self.state.read().await;
        state.directory().resolve(agent_id).map(|r| r.wallet)
    }

    async fn next_agent_id(&self) -> AgentId {
        self.state.read().await.directory().next_id()
    }
}

#[async_trait]
impl ReputationRegistry for Ledger {
    async fn give_feedback(
        &self,
        caller: &Address,
        agent_id: AgentId,
        input: FeedbackInput,
    ) -> LedgerResult<u64> {
        let mut state = self.state.write().await;
        let (index, events) = state.give_feedback(*caller, agent_id, input, Utc::now())?;
        self.publish(events);
        Ok(index)
    }

    async fn revoke_feedback(
        &self,
        caller: &Address,
        agent_id: AgentId,
        index: u64,
    ) -> LedgerResult<bool> {
        let mut state = self.state.write().await;
        let events = state.revoke_feedback(*caller, agent_id, index, Utc::now())?;
        let flipped = !events.is_empty();
        self.publish(events);
        Ok(flipped)
    }

    async fn read_feedback(
        &self,
        agent_id: AgentId,
        client: &Address,
        index: u64,
    ) -> LedgerResult<FeedbackEntry> {
        let state = self.state.read().await;
        state.feedback().read(agent_id, *client, index).cloned()
    }

    async fn get_clients(&self, agent_id: AgentId) -> LedgerResult<Vec<Address>> {
        let state = self.state.read().await;
        Ok(state.feedback().clients(agent_id).to_vec())
    }

    async fn get_last_index(&self, agent_id: AgentId, client: &Address) -> LedgerResult<u64> {
        let state = self.state.read().await;
        Ok(state.feedback().last_index(agent_id, *client))
    }

    async fn read_all_feedback(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
        include_revoked: bool,
    ) -> LedgerResult<FeedbackBatch> {
        let state = self.state.read().await;
        Ok(state.feedback().read_all(agent_id, filter, include_revoked))
    }

    async fn get_feedback_summary(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
    ) -> LedgerResult<FeedbackSummary> {
        let state = self.state.read().await;
        state.feedback().summary(agent_id, filter)
    }
}

#[async_trait]
impl ValidationRegistry for Ledger {
    async fn validation_request(
        &self,
        caller: &Address,
        validator: &Address,
        agent_id: AgentId,
        request_uri: &str,
        request_hash: Hash32,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let events = state.validation_request(
            *validator,
            agent_id,
            request_uri,
            request_hash,
            Utc::now(),
        )?;
        self.publish(events);
        debug!(
            requester = %caller,
            request_hash = %request_hash.short(),
            "validation request accepted"
        );
        Ok(())
    }

    async fn validation_response(
        &self,
        caller: &Address,
        request_hash: Hash32,
        input: ResponseInput,
    ) -> LedgerResult<()> {
        let mut state = self.state.write().await;
        let events = state.validation_response(*caller, request_hash, input, Utc::now())?;
        self.publish(events);
        Ok(())
    }

    async fn get_validation_status(&self, request_hash: Hash32) -> LedgerResult<ValidationStatus> {
        let state = self.state.read().await;
        state.validations().get(&request_hash).map(ValidationStatus::from)
    }

    async fn get_validation_record(&self, request_hash: Hash32) -> LedgerResult<ValidationRecord> {
        let state = self.state.read().await;
        state.validations().get(&request_hash).cloned()
    }

    async fn get_agent_validations(&self, agent_id: AgentId) -> LedgerResult<Vec<Hash32>> {
        let state = self.state.read().await;
        Ok(state.validations().agent_requests(agent_id).to_vec())
    }

    async fn get_validator_requests(&self, validator: &Address) -> LedgerResult<Vec<Hash32>> {
        let state = self.state.read().await;
        Ok(state.validations().validator_requests(*validator).to_vec())
    }

    async fn get_validation_summary(
        &self,
        agent_id: AgentId,
        validators: &[Address],
        tag: &str,
    ) -> LedgerResult<ValidationSummary> {
        let state = self.state.read().await;
        Ok(state.validations().summary(agent_id, validators, tag))
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}
