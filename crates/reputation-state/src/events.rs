//! Events emitted by committed ledger mutations.
//!
//! Every successful mutating call appends one or more [`LedgerEvent`]s to the
//! ledger journal, stamped with a ledger-wide sequence number starting at 1,
//! and broadcasts them to subscribers. Failed calls emit nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{hex_bytes, AgentId, Address, Hash32};

/// A single ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    Registered {
        agent_id: AgentId,
        agent_uri: String,
        owner: Address,
    },
    UriUpdated {
        agent_id: AgentId,
        agent_uri: String,
        updated_by: Address,
    },
    MetadataSet {
        agent_id: AgentId,
        key: String,
        #[serde(with = "hex_bytes")]
        value: Vec<u8>,
    },
    WalletUpdated {
        agent_id: AgentId,
        wallet: Option<Address>,
    },
    NewFeedback {
        agent_id: AgentId,
        client: Address,
        feedback_index: u64,
        value: i128,
        value_decimals: u8,
        /// SHA-256 of `tag1`, for indexed lookup by subscribers
        indexed_tag1: Hash32,
        tag1: String,
        tag2: String,
        endpoint: String,
        feedback_uri: String,
        feedback_hash: Hash32,
    },
    FeedbackRevoked {
        agent_id: AgentId,
        client: Address,
        feedback_index: u64,
    },
    ValidationRequest {
        validator: Address,
        agent_id: AgentId,
        request_uri: String,
        request_hash: Hash32,
    },
    ValidationResponse {
        validator: Address,
        agent_id: AgentId,
        request_hash: Hash32,
        response: u8,
        response_uri: String,
        response_hash: Hash32,
        tag: String,
    },
}

impl LedgerEvent {
    /// Stable event name, e.g. `"new_feedback"`.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Registered { .. } => "registered",
            LedgerEvent::UriUpdated { .. } => "uri_updated",
            LedgerEvent::MetadataSet { .. } => "metadata_set",
            LedgerEvent::WalletUpdated { .. } => "wallet_updated",
            LedgerEvent::NewFeedback { .. } => "new_feedback",
            LedgerEvent::FeedbackRevoked { .. } => "feedback_revoked",
            LedgerEvent::ValidationRequest { .. } => "validation_request",
            LedgerEvent::ValidationResponse { .. } => "validation_response",
        }
    }

    /// Agent the event concerns.
    pub fn agent_id(&self) -> AgentId {
        match self {
            LedgerEvent::Registered { agent_id, .. }
            | LedgerEvent::UriUpdated { agent_id, .. }
            | LedgerEvent::MetadataSet { agent_id, .. }
            | LedgerEvent::WalletUpdated { agent_id, .. }
            | LedgerEvent::NewFeedback { agent_id, .. }
            | LedgerEvent::FeedbackRevoked { agent_id, .. }
            | LedgerEvent::ValidationRequest { agent_id, .. }
            | LedgerEvent::ValidationResponse { agent_id, .. } => *agent_id,
        }
    }
}

/// A journaled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Ledger-wide monotonic sequence number (starts at 1)
    pub seq: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_feedback_event_round_trips_large_values() {
        let event = LedgerEvent::NewFeedback {
            agent_id: AgentId(7),
            client: Address::new([3; 20]),
            feedback_index: 2,
            value: i128::MIN,
            value_decimals: 18,
            indexed_tag1: Hash32::digest(b"quality"),
            tag1: "quality".to_string(),
            tag2: String::new(),
            endpoint: String::new(),
            feedback_uri: String::new(),
            feedback_hash: Hash32::ZERO,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with("{\"new_feedback\""));
        let back: LedgerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.agent_id(), AgentId(7));
        assert_eq!(back.name(), "new_feedback");
    }
}
