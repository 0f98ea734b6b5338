//! Error types for reputation-state

use std::fmt;

use thiserror::Error;

use crate::types::{AgentId, Address, Hash32};

/// Role a caller must hold for a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owner of an agent record
    Owner,
    /// Client that submitted a feedback entry
    Client,
    /// Validator named in a validation request
    Validator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Client => "client",
            Role::Validator => "validator",
        };
        f.write_str(s)
    }
}

/// Errors produced by the ledger.
///
/// Every operation that returns an error leaves the ledger unchanged.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Unknown agent, feedback entry or validation request
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Caller does not hold the role the operation requires
    #[error("unauthorized: {caller} is not the {role} of {subject}")]
    Unauthorized {
        caller: Address,
        role: Role,
        subject: String,
    },

    /// A write referenced an agent that does not exist
    #[error("unknown agent: {agent_id}")]
    UnknownAgent { agent_id: AgentId },

    /// Request hash already used by an earlier validation request
    #[error("duplicate validation request: {request_hash}")]
    DuplicateRequest { request_hash: Hash32 },

    /// Validation request already carries a response
    #[error("validation request already resolved: {request_hash}")]
    AlreadyResolved { request_hash: Hash32 },

    /// Every agent id has been issued
    #[error("agent ids exhausted: no id after {last}")]
    AgentIdsExhausted { last: AgentId },

    /// Validation score outside 0..=100
    #[error("invalid score {score}: must be between 0 and 100")]
    InvalidScore { score: u8 },

    /// Feedback decimals outside 0..=18
    #[error("invalid value decimals {decimals}: must be at most 18")]
    InvalidDecimals { decimals: u8 },

    /// Aggregation exceeded the i128 range
    #[error("arithmetic overflow while {context}")]
    Overflow { context: &'static str },

    /// Malformed address or hash text
    #[error("invalid hex {input:?}: expected {expected_bytes} bytes")]
    InvalidHex { input: String, expected_bytes: usize },

    /// Snapshot failed invariant validation on restore
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Snapshot storage I/O failure
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failure
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        LedgerError::NotFound { what: what.into() }
    }

    pub(crate) fn unauthorized(caller: Address, role: Role, subject: impl Into<String>) -> Self {
        LedgerError::Unauthorized {
            caller,
            role,
            subject: subject.into(),
        }
    }

    /// Short machine-readable name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Unauthorized { .. } => "unauthorized",
            LedgerError::UnknownAgent { .. } => "unknown_agent",
            LedgerError::DuplicateRequest { .. } => "duplicate_request",
            LedgerError::AlreadyResolved { .. } => "already_resolved",
            LedgerError::AgentIdsExhausted { .. } => "agent_ids_exhausted",
            LedgerError::InvalidScore { .. } => "invalid_score",
            LedgerError::InvalidDecimals { .. } => "invalid_decimals",
            LedgerError::Overflow { .. } => "overflow",
            LedgerError::InvalidHex { .. } => "invalid_hex",
            LedgerError::CorruptSnapshot(_) => "corrupt_snapshot",
            LedgerError::Io(_) => "io",
            LedgerError::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_names_role_and_subject() {
        let err = LedgerError::unauthorized(Address::ZERO, Role::Validator, "request 0xab");
        let msg = err.to_string();
        assert!(msg.contains("validator"));
        assert!(msg.contains("request 0xab"));
        assert_eq!(err.kind(), "unauthorized");
    }

    #[test]
    fn invalid_score_display() {
        let err = LedgerError::InvalidScore { score: 101 };
        assert!(err.to_string().contains("101"));
    }
}
