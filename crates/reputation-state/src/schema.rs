//! Record and read-model definitions for the three registries
//!
//! Stored records:
//! - `AgentRecord`: owner, wallet, URI and metadata of a registered agent
//! - `FeedbackEntry`: one client's rating of an agent
//! - `ValidationRecord`: a validation request and its optional response
//!
//! Read models:
//! - `FeedbackBatch`, `FeedbackSummary`, `ValidationStatus`, `ValidationSummary`

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{hex_bytes, hex_bytes_map, AgentId, Address, Hash32};

/// Largest accepted `value_decimals` for feedback.
pub const MAX_VALUE_DECIMALS: u8 = 18;

/// Largest accepted validation score.
pub const MAX_SCORE: u8 = 100;

// ---------------------------------------------------------------------------
// Agent directory
// ---------------------------------------------------------------------------

/// Key/value pair attached to an agent at registration or via `set_metadata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    #[serde(with = "hex_bytes")]
    pub value: Vec<u8>,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    /// Set at registration; the only address allowed to mutate the record
    pub owner: Address,
    /// Defaults to `owner`; `None` once explicitly unset
    pub wallet: Option<Address>,
    pub uri: String,
    #[serde(with = "hex_bytes_map", default)]
    pub metadata: BTreeMap<String, Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// Caller-supplied fields of a feedback submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackInput {
    /// Signed fixed-point magnitude
    pub value: i128,
    /// Decimal places of `value` (0..=18)
    pub value_decimals: u8,
    pub tag1: String,
    pub tag2: String,
    pub endpoint: String,
    pub feedback_uri: String,
    pub feedback_hash: Hash32,
}

impl FeedbackInput {
    /// Plain rating with no decimals, tags only.
    pub fn rating(value: i128, tag1: impl Into<String>, tag2: impl Into<String>) -> Self {
        Self {
            value,
            value_decimals: 0,
            tag1: tag1.into(),
            tag2: tag2.into(),
            endpoint: String::new(),
            feedback_uri: String::new(),
            feedback_hash: Hash32::ZERO,
        }
    }

    pub fn with_decimals(mut self, value_decimals: u8) -> Self {
        self.value_decimals = value_decimals;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_uri(mut self, feedback_uri: impl Into<String>, feedback_hash: Hash32) -> Self {
        self.feedback_uri = feedback_uri.into();
        self.feedback_hash = feedback_hash;
        self
    }
}

/// A stored feedback entry. Immutable apart from `revoked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub agent_id: AgentId,
    pub client: Address,
    /// Per-(agent, client) sequence number starting at 1
    pub index: u64,
    pub value: i128,
    pub value_decimals: u8,
    pub tag1: String,
    pub tag2: String,
    pub endpoint: String,
    pub feedback_uri: String,
    pub feedback_hash: Hash32,
    pub revoked: bool,
}

impl FeedbackEntry {
    /// Exact-match tag filter; empty filters match everything.
    pub fn matches_tags(&self, tag1: &str, tag2: &str) -> bool {
        (tag1.is_empty() || self.tag1 == tag1) && (tag2.is_empty() || self.tag2 == tag2)
    }
}

/// Selection shared by `read_all_feedback` and the feedback summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackFilter {
    /// Clients to include; empty means every client of the agent
    pub clients: Vec<Address>,
    /// Exact `tag1` match; empty matches all
    pub tag1: String,
    /// Exact `tag2` match; empty matches all
    pub tag2: String,
}

impl FeedbackFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn clients(mut self, clients: impl IntoIterator<Item = Address>) -> Self {
        self.clients = clients.into_iter().collect();
        self
    }

    pub fn tag1(mut self, tag1: impl Into<String>) -> Self {
        self.tag1 = tag1.into();
        self
    }

    pub fn tag2(mut self, tag2: impl Into<String>) -> Self {
        self.tag2 = tag2.into();
        self
    }
}

/// Parallel-array result of `read_all_feedback`.
///
/// All vectors always have the same length. Rows are ordered by client
/// enumeration order, then by index ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackBatch {
    pub clients: Vec<Address>,
    pub indexes: Vec<u64>,
    pub values: Vec<i128>,
    pub value_decimals: Vec<u8>,
    pub tag1s: Vec<String>,
    pub tag2s: Vec<String>,
    pub revoked: Vec<bool>,
}

impl FeedbackBatch {
    pub fn push(&mut self, entry: &FeedbackEntry) {
        self.clients.push(entry.client);
        self.indexes.push(entry.index);
        self.values.push(entry.value);
        self.value_decimals.push(entry.value_decimals);
        self.tag1s.push(entry.tag1.clone());
        self.tag2s.push(entry.tag2.clone());
        self.revoked.push(entry.revoked);
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

/// Aggregate over non-revoked feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub count: u64,
    /// Sum of values scaled to `summary_value_decimals`
    pub summary_value: i128,
    pub summary_value_decimals: u8,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// An immutable validation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub request_hash: Hash32,
    pub validator: Address,
    pub agent_id: AgentId,
    pub request_uri: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields of a validation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInput {
    /// 0..=100
    pub score: u8,
    pub response_uri: String,
    pub response_hash: Hash32,
    pub tag: String,
}

impl ResponseInput {
    pub fn new(score: u8, tag: impl Into<String>) -> Self {
        Self {
            score,
            response_uri: String::new(),
            response_hash: Hash32::ZERO,
            tag: tag.into(),
        }
    }

    pub fn with_uri(mut self, response_uri: impl Into<String>, response_hash: Hash32) -> Self {
        self.response_uri = response_uri.into();
        self.response_hash = response_hash;
        self
    }
}

/// The response attached to a resolved request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub score: u8,
    pub response_uri: String,
    pub response_hash: Hash32,
    pub tag: String,
    pub updated_at: DateTime<Utc>,
}

/// A validation request and, once resolved, its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub request: ValidationRequest,
    pub response: Option<ValidationResponse>,
}

impl ValidationRecord {
    pub fn state(&self) -> ValidationState {
        if self.response.is_some() {
            ValidationState::Resolved
        } else {
            ValidationState::Pending
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.response.is_some()
    }
}

/// Lifecycle of a validation request: Pending → Resolved (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationState {
    Pending,
    Resolved,
}

/// Flattened status view; pending requests read as zero/empty response fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStatus {
    pub request_hash: Hash32,
    pub validator: Address,
    pub agent_id: AgentId,
    pub state: ValidationState,
    pub response: u8,
    pub response_uri: String,
    pub response_hash: Hash32,
    pub tag: String,
    /// Response time when resolved, request creation time when pending
    pub last_update: DateTime<Utc>,
}

impl From<&ValidationRecord> for ValidationStatus {
    fn from(record: &ValidationRecord) -> Self {
        let request = &record.request;
        match &record.response {
            Some(response) => ValidationStatus {
                request_hash: request.request_hash,
                validator: request.validator,
                agent_id: request.agent_id,
                state: ValidationState::Resolved,
                response: response.score,
                response_uri: response.response_uri.clone(),
                response_hash: response.response_hash,
                tag: response.tag.clone(),
                last_update: response.updated_at,
            },
            None => ValidationStatus {
                request_hash: request.request_hash,
                validator: request.validator,
                agent_id: request.agent_id,
                state: ValidationState::Pending,
                response: 0,
                response_uri: String::new(),
                response_hash: Hash32::ZERO,
                tag: String::new(),
                last_update: request.created_at,
            },
        }
    }
}

/// Aggregate over resolved validations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub count: u64,
    /// Truncating integer mean of the scores
    pub average_response: u8,
}
