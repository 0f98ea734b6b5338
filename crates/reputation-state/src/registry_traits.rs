//! Registry trait definitions
//!
//! These traits define the three registry surfaces:
//! - `IdentityRegistry`: agent registration and owner-gated record updates
//! - `ReputationRegistry`: client feedback, revocation and aggregation
//! - `ValidationRegistry`: validator request/response workflow
//!
//! All traits are async and backend-agnostic. Mutating methods take the
//! calling address explicitly; every error leaves the registry unchanged.
//! [`crate::Ledger`] implements all three over one shared state.

use async_trait::async_trait;

use crate::schema::{
    AgentRecord, FeedbackBatch, FeedbackEntry, FeedbackFilter, FeedbackInput, FeedbackSummary,
    MetadataEntry, ResponseInput, ValidationRecord, ValidationStatus, ValidationSummary,
};
use crate::types::{AgentId, Address, Hash32};
use crate::LedgerResult;

// ---------------------------------------------------------------------------
// IdentityRegistry (agent directory)
// ---------------------------------------------------------------------------

/// Agent directory.
///
/// Guarantees:
/// - Ids are issued strictly increasing from 1 and never reused.
/// - Only the owner may change `uri`, `metadata` or `wallet`.
/// - Unknown agents fail `NotFound` before ownership is checked.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// Register a new agent owned by `caller`; wallet defaults to `caller`.
    async fn register(
        &self,
        caller: &Address,
        agent_uri: &str,
        metadata: Vec<MetadataEntry>,
    ) -> LedgerResult<AgentId>;

    async fn set_agent_uri(&self, caller: &Address, agent_id: AgentId, uri: &str)
        -> LedgerResult<()>;

    /// Insert or overwrite one metadata key.
    async fn set_metadata(
        &self,
        caller: &Address,
        agent_id: AgentId,
        key: &str,
        value: Vec<u8>,
    ) -> LedgerResult<()>;

    async fn set_agent_wallet(
        &self,
        caller: &Address,
        agent_id: AgentId,
        wallet: Address,
    ) -> LedgerResult<()>;

    /// Clear the wallet. It stays absent until set again.
    async fn unset_agent_wallet(&self, caller: &Address, agent_id: AgentId) -> LedgerResult<()>;

    async fn resolve(&self, agent_id: AgentId) -> LedgerResult<AgentRecord>;

    /// Every registered agent, ascending by id.
    async fn list_agents(&self) -> LedgerResult<Vec<AgentRecord>>;

    async fn owner_of(&self, agent_id: AgentId) -> LedgerResult<Address>;

    async fn get_metadata(&self, agent_id: AgentId, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    async fn get_agent_wallet(&self, agent_id: AgentId) -> LedgerResult<Option<Address>>;

    /// The id the next `register` call will issue.
    async fn next_agent_id(&self) -> AgentId;
}

// ---------------------------------------------------------------------------
// ReputationRegistry (feedback ledger)
// ---------------------------------------------------------------------------

/// Append-only feedback ledger.
///
/// Guarantees:
/// - Indices are assigned per (agent, client), from 1, without gaps.
/// - Entries are never deleted; `revoked` only goes false → true.
/// - Summaries never include revoked entries.
/// - Batch rows are ordered by client enumeration order, then index.
#[async_trait]
pub trait ReputationRegistry: Send + Sync {
    /// Append feedback from `caller` and return its index.
    async fn give_feedback(
        &self,
        caller: &Address,
        agent_id: AgentId,
        input: FeedbackInput,
    ) -> LedgerResult<u64>;

    /// Revoke one of the caller's own entries. Idempotent: returns `true`
    /// only for the call that actually flipped the entry.
    async fn revoke_feedback(
        &self,
        caller: &Address,
        agent_id: AgentId,
        index: u64,
    ) -> LedgerResult<bool>;

    async fn read_feedback(
        &self,
        agent_id: AgentId,
        client: &Address,
        index: u64,
    ) -> LedgerResult<FeedbackEntry>;

    /// Distinct clients in first-submission order.
    async fn get_clients(&self, agent_id: AgentId) -> LedgerResult<Vec<Address>>;

    /// Number of entries `client` ever gave `agent_id` (0 if none).
    async fn get_last_index(&self, agent_id: AgentId, client: &Address) -> LedgerResult<u64>;

    async fn read_all_feedback(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
        include_revoked: bool,
    ) -> LedgerResult<FeedbackBatch>;

    /// Decimal-normalized sum over non-revoked entries matching `filter`.
    async fn get_feedback_summary(
        &self,
        agent_id: AgentId,
        filter: &FeedbackFilter,
    ) -> LedgerResult<FeedbackSummary>;
}

// ---------------------------------------------------------------------------
// ValidationRegistry (validation workflow)
// ---------------------------------------------------------------------------

/// Validation request/response workflow.
///
/// Semantics:
/// - A request is Pending until its named validator responds once.
/// - Resolved is terminal: no second response, no score amendment.
/// - Request hashes are unique forever, including resolved requests.
#[async_trait]
pub trait ValidationRegistry: Send + Sync {
    async fn validation_request(
        &self,
        caller: &Address,
        validator: &Address,
        agent_id: AgentId,
        request_uri: &str,
        request_hash: Hash32,
    ) -> LedgerResult<()>;

    async fn validation_response(
        &self,
        caller: &Address,
        request_hash: Hash32,
        input: ResponseInput,
    ) -> LedgerResult<()>;

    async fn get_validation_status(&self, request_hash: Hash32) -> LedgerResult<ValidationStatus>;

    async fn get_validation_record(&self, request_hash: Hash32) -> LedgerResult<ValidationRecord>;

    /// Request hashes for `agent_id` in creation order.
    async fn get_agent_validations(&self, agent_id: AgentId) -> LedgerResult<Vec<Hash32>>;

    /// Request hashes naming `validator` in creation order.
    async fn get_validator_requests(&self, validator: &Address) -> LedgerResult<Vec<Hash32>>;

    /// Truncating mean over resolved requests, optionally restricted to a
    /// validator set and an exact tag (empty = no restriction).
    async fn get_validation_summary(
        &self,
        agent_id: AgentId,
        validators: &[Address],
        tag: &str,
    ) -> LedgerResult<ValidationSummary>;
}
