//! Thin API layer over the ledger.
//!
//! `ReputationService` forwards to the registry traits implemented by
//! [`Ledger`], and around every mutation it enters an operation span,
//! emits the matching `obs` event and bumps `METRICS`. Rejections are
//! logged once here, at `warn`.

use std::sync::Arc;

use reputation_state::{
    AgentId, AgentRecord, Address, FeedbackBatch, FeedbackEntry, FeedbackFilter, FeedbackInput,
    FeedbackSummary, Hash32, IdentityRegistry, Ledger, LedgerError, MetadataEntry,
    ReputationRegistry, ResponseInput, SequencedEvent, ValidationRecord, ValidationRegistry,
    ValidationState, ValidationStatus, ValidationSummary,
};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs;

/// Everything known about one agent, read from a single committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub agent: AgentRecord,
    pub clients: Vec<Address>,
    /// All clients, no tag filter, revoked entries excluded
    pub feedback: FeedbackSummary,
    /// All validators, no tag filter, resolved requests only
    pub validation: ValidationSummary,
    pub pending_validations: u64,
    pub resolved_validations: u64,
}

/// Service facade over a shared [`Ledger`].
#[derive(Debug, Clone)]
pub struct ReputationService {
    ledger: Arc<Ledger>,
}

fn rejected(op: &'static str, error: LedgerError) -> crate::ReputationError {
    obs::emit_operation_rejected(op, &error);
    METRICS.inc_operations_rejected();
    error.into()
}

impl ReputationService {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    // ------------------------------------------------------------------
    // Agent directory
    // ------------------------------------------------------------------

    pub async fn register(
        &self,
        caller: &Address,
        agent_uri: &str,
        metadata: Vec<MetadataEntry>,
    ) -> Result<AgentId> {
        let span = obs::operation_span("register", caller);
        let agent_id = self
            .ledger
            .register(caller, agent_uri, metadata)
            .instrument(span)
            .await
            .map_err(|e| rejected("register", e))?;
        obs::emit_agent_registered(agent_id, caller, agent_uri);
        METRICS.inc_agents_registered();
        Ok(agent_id)
    }

    pub async fn set_agent_uri(
        &self,
        caller: &Address,
        agent_id: AgentId,
        uri: &str,
    ) -> Result<()> {
        self.ledger
            .set_agent_uri(caller, agent_id, uri)
            .instrument(obs::operation_span("set_agent_uri", caller))
            .await
            .map_err(|e| rejected("set_agent_uri", e))?;
        obs::emit_agent_updated(agent_id, "uri");
        Ok(())
    }

    pub async fn set_metadata(
        &self,
        caller: &Address,
        agent_id: AgentId,
        key: &str,
        value: Vec<u8>,
    ) -> Result<()> {
        self.ledger
            .set_metadata(caller, agent_id, key, value)
            .instrument(obs::operation_span("set_metadata", caller))
            .await
            .map_err(|e| rejected("set_metadata", e))?;
        obs::emit_agent_updated(agent_id, "metadata");
        Ok(())
    }

    /// Set the wallet, or clear it when `wallet` is `None`.
    pub async fn set_agent_wallet(
        &self,
        caller: &Address,
        agent_id: AgentId,
        wallet: Option<Address>,
    ) -> Result<()> {
        let op = if wallet.is_some() {
            "set_agent_wallet"
        } else {
            "unset_agent_wallet"
        };
        let span = obs::operation_span(op, caller);
        let result = match wallet {
            Some(wallet) => {
                self.ledger
                    .set_agent_wallet(caller, agent_id, wallet)
                    .instrument(span)
                    .await
            }
            None => self.ledger.unset_agent_wallet(caller, agent_id).instrument(span).await,
        };
        result.map_err(|e| rejected(op, e))?;
        obs::emit_agent_updated(agent_id, "wallet");
        Ok(())
    }

    pub async fn resolve(&self, agent_id: AgentId) -> Result<AgentRecord> {
        Ok(self.ledger.resolve(agent_id).await?)
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        Ok(self.ledger.list_agents().await?)
    }

    pub async fn get_metadata(&self, agent_id: AgentId, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.ledger.get_metadata(agent_id, key).await?)
    }

    pub async fn next_agent_id(&self) -> AgentId {
        self.ledger.next_agent_id().await
    }

    // ------------------------------------------------------------------
    // Feedback
    // ------------------------------------------------------------------

    pub async fn give_feedback(
        &self,
        caller: &Address,
        agent_id: AgentId,
        input: FeedbackInput,
    ) -> Result<u64> {
        let tag1 = input.tag1.clone();
        let index = self
            .ledger
            .give_feedback(caller, agent_id, input)
            .instrument(obs::operation_span("give_feedback", caller))
            .await
            .map_err(|e| rejected("give_feedback", e))?;
        obs::emit_feedback_given(agent_id, caller, index, &tag1);
        METRICS.inc_feedback_given();
        Ok(index)
    }

    pub async fn revoke_feedback(
        &self,
        caller: &Address,
        agent_id: AgentId,
        index: u64,
    ) -> Result<bool> {
        let flipped = self
            .ledger
            .revoke_feedback(caller, agent_id, index)
            .instrument(obs::operation_span("revoke_feedback", caller))
            .await
            .map_err(|e| rejected("revoke_feedback", e))?;
        if flipped {
            obs::emit_feedback_revoked(agent_id, caller, index);
            METRICS.inc_feedback_revoked();
        }
        Ok(flipped)
    }

    pub async fn read_feedback(
        &self,
        agent_id: AgentId,
        client: &Address,
        index: u64,
    ) -> Result<FeedbackEntry> {
        Ok(self.ledger.read_feedback(agent_id, client, index).await?)
    }

    pub async fn get_clients(&self, agent_id: AgentId) -> Result<Vec<Address>> {
        Ok(self.ledger.get_clients(agent_id).await?)
    }

    pub async fn get_last_index(&self, agent_id: AgentId, client: &Address) -> Result<u64> {
        Ok(self.ledger.get_last_index(agent_id, client).await?)
    }

    pub async fn read_all_feedback(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
        include_revoked: bool,
    ) -> Result<FeedbackBatch> {
        Ok(self
            .ledger
            .read_all_feedback(agent_id, filter, include_revoked)
            .await?)
    }

    pub async fn get_feedback_summary(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
    ) -> Result<FeedbackSummary> {
        Ok(self.ledger.get_feedback_summary(agent_id, filter).await?)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    pub async fn validation_request(
        &self,
        caller: &Address,
        validator: &Address,
        agent_id: AgentId,
        request_uri: &str,
        request_hash: Hash32,
    ) -> Result<()> {
        self.ledger
            .validation_request(caller, validator, agent_id, request_uri, request_hash)
            .instrument(obs::operation_span("validation_request", caller))
            .await
            .map_err(|e| rejected("validation_request", e))?;
        obs::emit_validation_requested(&request_hash, validator, agent_id);
        METRICS.inc_validations_requested();
        Ok(())
    }

    pub async fn validation_response(
        &self,
        caller: &Address,
        request_hash: Hash32,
        input: ResponseInput,
    ) -> Result<()> {
        let (score, tag) = (input.score, input.tag.clone());
        self.ledger
            .validation_response(caller, request_hash, input)
            .instrument(obs::operation_span("validation_response", caller))
            .await
            .map_err(|e| rejected("validation_response", e))?;
        obs::emit_validation_resolved(&request_hash, score, &tag);
        METRICS.inc_validations_resolved();
        Ok(())
    }

    pub async fn get_validation_status(&self, request_hash: Hash32) -> Result<ValidationStatus> {
        Ok(self.ledger.get_validation_status(request_hash).await?)
    }

    pub async fn get_validation_record(&self, request_hash: Hash32) -> Result<ValidationRecord> {
        Ok(self.ledger.get_validation_record(request_hash).await?)
    }

    pub async fn get_agent_validations(&self, agent_id: AgentId) -> Result<Vec<Hash32>> {
        Ok(self.ledger.get_agent_validations(agent_id).await?)
    }

    pub async fn get_validator_requests(&self, validator: &Address) -> Result<Vec<Hash32>> {
        Ok(self.ledger.get_validator_requests(validator).await?)
    }

    pub async fn get_validation_summary(
        &self,
        agent_id: AgentId,
        validators: &[Address],
        tag: &str,
    ) -> Result<ValidationSummary> {
        Ok(self
            .ledger
            .get_validation_summary(agent_id, validators, tag)
            .await?)
    }

    // ------------------------------------------------------------------
    // Aggregate reads
    // ------------------------------------------------------------------

    /// Agent record plus feedback and validation aggregates, all taken
    /// under one read lock.
    pub async fn agent_profile(&self, agent_id: AgentId) -> Result<AgentProfile> {
        let state = self.ledger.read().await;
        let agent = state.directory().resolve(agent_id)?.clone();
        let clients = state.feedback().clients(agent_id).to_vec();
        let feedback = state
            .feedback()
            .summary(agent_id, &FeedbackFilter::all())?;
        let validation = state.validations().summary(agent_id, &[], "");

        let (mut pending, mut resolved) = (0u64, 0u64);
        for record in state.validations().agent_records(agent_id) {
            match record.state() {
                ValidationState::Pending => pending += 1,
                ValidationState::Resolved => resolved += 1,
            }
        }

        Ok(AgentProfile {
            agent,
            clients,
            feedback,
            validation,
            pending_validations: pending,
            resolved_validations: resolved,
        })
    }

    /// Journaled events with `seq > after`.
    pub async fn events_since(&self, after: u64) -> Vec<SequencedEvent> {
        self.ledger.events_since(after).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[tokio::test]
    async fn profile_combines_directory_feedback_and_validation() {
        let service = ReputationService::new(Arc::new(Ledger::new()));
        let owner = addr(1);
        let validator = addr(9);
        let agent = service.register(&owner, "ipfs://agent", vec![]).await.unwrap();

        service
            .give_feedback(&addr(2), agent, FeedbackInput::rating(5, "quality", ""))
            .await
            .unwrap();
        service
            .give_feedback(&addr(3), agent, FeedbackInput::rating(4, "speed", ""))
            .await
            .unwrap();

        let first = Hash32::digest(b"first");
        let second = Hash32::digest(b"second");
        service
            .validation_request(&owner, &validator, agent, "", first)
            .await
            .unwrap();
        service
            .validation_request(&owner, &validator, agent, "", second)
            .await
            .unwrap();
        service
            .validation_response(&validator, first, ResponseInput::new(80, "zkml"))
            .await
            .unwrap();

        let profile = service.agent_profile(agent).await.unwrap();
        assert_eq!(profile.agent.uri, "ipfs://agent");
        assert_eq!(profile.clients, vec![addr(2), addr(3)]);
        assert_eq!(profile.feedback.count, 2);
        assert_eq!(profile.feedback.summary_value, 9);
        assert_eq!(profile.validation.count, 1);
        assert_eq!(profile.validation.average_response, 80);
        assert_eq!(profile.pending_validations, 1);
        assert_eq!(profile.resolved_validations, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_revokes_flip_exactly_once() {
        let service = ReputationService::new(Arc::new(Ledger::new()));
        let client = addr(2);
        let agent = service.register(&addr(1), "ipfs://agent", vec![]).await.unwrap();
        service
            .give_feedback(&client, agent, FeedbackInput::rating(5, "", ""))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.revoke_feedback(&client, agent, 1).await })
            })
            .collect();
        let mut flipped = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                flipped += 1;
            }
        }
        assert_eq!(flipped, 1);

        let revocations = service
            .events_since(0)
            .await
            .iter()
            .filter(|e| e.event.name() == "feedback_revoked")
            .count();
        assert_eq!(revocations, 1);
        assert!(!service.revoke_feedback(&client, agent, 1).await.unwrap());
    }

    #[tokio::test]
    async fn list_agents_follows_registration_order() {
        let service = ReputationService::new(Arc::new(Ledger::new()));
        service.register(&addr(1), "ipfs://one", vec![]).await.unwrap();
        service.register(&addr(2), "ipfs://two", vec![]).await.unwrap();
        let uris: Vec<String> = service
            .list_agents()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.uri)
            .collect();
        assert_eq!(uris, vec!["ipfs://one", "ipfs://two"]);
    }

    #[tokio::test]
    async fn profile_of_unknown_agent_is_not_found() {
        let service = ReputationService::new(Arc::new(Ledger::new()));
        let err = service.agent_profile(AgentId(5)).await.unwrap_err();
        assert!(matches!(err.as_ledger(), Some(LedgerError::NotFound { .. })));
    }

    #[tokio::test]
    async fn wallet_none_unsets() {
        let service = ReputationService::new(Arc::new(Ledger::new()));
        let owner = addr(1);
        let agent = service.register(&owner, "", vec![]).await.unwrap();

        service.set_agent_wallet(&owner, agent, None).await.unwrap();
        assert_eq!(service.resolve(agent).await.unwrap().wallet, None);

        service
            .set_agent_wallet(&owner, agent, Some(addr(7)))
            .await
            .unwrap();
        assert_eq!(service.resolve(agent).await.unwrap().wallet, Some(addr(7)));
    }

    #[tokio::test]
    async fn rejections_surface_the_ledger_error() {
        let service = ReputationService::new(Arc::new(Ledger::new()));
        let err = service
            .give_feedback(&addr(2), AgentId(1), FeedbackInput::rating(1, "", ""))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ledger(),
            Some(LedgerError::UnknownAgent { .. })
        ));
    }
}
