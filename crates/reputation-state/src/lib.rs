//! Reputation-State: Agent Reputation Ledger
//!
//! This crate provides the ledger behind the agent registries: an
//! append-only record of feedback and validation events keyed by agent id,
//! with client-scoped indexing, revocation and on-demand aggregation.
//!
//! ## Layer 0 - Data/Consistency
//!
//! Focus: invariants, single-writer atomicity, durable snapshots.
//!
//! ## Key Components
//!
//! - `Ledger`: one `LedgerState` behind a single-writer lock, implementing
//!   `IdentityRegistry`, `ReputationRegistry` and `ValidationRegistry`
//! - `LedgerState`: directory, feedback book, validation book and event journal
//! - `SnapshotStore`: durable `LedgerSnapshot` persistence

mod directory;
mod error;
pub mod events;
pub mod fakes;
mod feedback;
mod ledger;
pub mod registry_traits;
mod schema;
pub mod snapshot_store;
mod state;
mod types;
mod validation;

pub use directory::AgentDirectory;
pub use error::{LedgerError, Role};
pub use events::{LedgerEvent, SequencedEvent};
pub use feedback::FeedbackBook;
pub use ledger::{Ledger, DEFAULT_EVENT_CAPACITY};
pub use registry_traits::{IdentityRegistry, ReputationRegistry, ValidationRegistry};
pub use schema::{
    AgentRecord, FeedbackBatch, FeedbackEntry, FeedbackFilter, FeedbackInput, FeedbackSummary,
    MetadataEntry, ResponseInput, ValidationRecord, ValidationRequest, ValidationResponse,
    ValidationState, ValidationStatus, ValidationSummary, MAX_SCORE, MAX_VALUE_DECIMALS,
};
pub use snapshot_store::{FsSnapshotStore, SnapshotStore};
pub use state::{LedgerSnapshot, LedgerState, SNAPSHOT_VERSION};
pub use types::{AgentId, Address, Hash32};
pub use validation::ValidationBook;

/// Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
