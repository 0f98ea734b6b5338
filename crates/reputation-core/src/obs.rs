//! Structured observability hooks for ledger operations.
//!
//! This module provides:
//! - Operation-scoped tracing spans via the `OperationSpan` RAII guard
//! - Emission functions for committed registry actions and rejections
//!
//! Committed actions are emitted at `info!`, rejections at `warn!`.
//! For JSON output, set `REPUTATION_LOG_FORMAT=json`.

use reputation_state::{AgentId, Address, Hash32, LedgerError};
use tracing::{info, warn};

/// Span for one registry mutation, tagged with the operation and caller.
///
/// Attach to a future with `tracing::Instrument::instrument`.
pub fn operation_span(op: &'static str, caller: &Address) -> tracing::Span {
    tracing::info_span!("reputation.op", op = op, caller = %caller)
}

/// RAII guard that enters an operation span for synchronous scopes,
/// such as one CLI command.
///
/// ```ignore
/// let _span = OperationSpan::enter("feedback.give", &caller);
/// // every event below carries op = "feedback.give" and the caller
/// ```
pub struct OperationSpan {
    _span: tracing::span::EnteredSpan,
}

impl OperationSpan {
    pub fn enter(op: &'static str, caller: &Address) -> Self {
        Self {
            _span: operation_span(op, caller).entered(),
        }
    }
}

pub fn emit_agent_registered(agent_id: AgentId, owner: &Address, uri: &str) {
    info!(event = "agent.registered", agent_id = %agent_id, owner = %owner, uri = %uri);
}

/// Emit event: owner changed the agent URI, metadata or wallet.
pub fn emit_agent_updated(agent_id: AgentId, field: &str) {
    info!(event = "agent.updated", agent_id = %agent_id, field = %field);
}

pub fn emit_feedback_given(agent_id: AgentId, client: &Address, index: u64, tag1: &str) {
    info!(
        event = "feedback.given",
        agent_id = %agent_id,
        client = %client,
        index = index,
        tag1 = %tag1,
    );
}

pub fn emit_feedback_revoked(agent_id: AgentId, client: &Address, index: u64) {
    info!(event = "feedback.revoked", agent_id = %agent_id, client = %client, index = index);
}

pub fn emit_validation_requested(request_hash: &Hash32, validator: &Address, agent_id: AgentId) {
    info!(
        event = "validation.requested",
        request_hash = %request_hash,
        validator = %validator,
        agent_id = %agent_id,
    );
}

pub fn emit_validation_resolved(request_hash: &Hash32, score: u8, tag: &str) {
    info!(
        event = "validation.resolved",
        request_hash = %request_hash,
        score = score,
        tag = %tag,
    );
}

/// Emit event: an operation failed (warning level).
pub fn emit_operation_rejected(op: &str, error: &LedgerError) {
    warn!(event = "operation.rejected", op = %op, kind = error.kind(), error = %error);
}

/// Emit event: the audit writer skipped events it could not keep up with.
pub fn emit_audit_lagged(skipped: u64) {
    warn!(event = "audit.lagged", skipped = skipped);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_spans_create() {
        let _guard = OperationSpan::enter("register", &Address::ZERO);
        let _detached = operation_span("set_agent_uri", &Address::ZERO);
    }
}
