//! Reputation Core Library
//!
//! Service layer over the reputation ledger: the `ReputationService` facade,
//! configuration, tracing setup, structured observability, metrics, the
//! audit log and persistent sessions.

pub mod audit;
pub mod config;
pub mod error;
pub mod metrics;
pub mod obs;
pub mod service;
pub mod session;
pub mod telemetry;

pub use audit::{spawn_audit_writer, AuditLog};
pub use config::LedgerConfig;
pub use error::{ConfigError, ReputationError, Result};
pub use metrics::{Metrics, MetricsSnapshot, METRICS};
pub use obs::{
    emit_agent_registered, emit_agent_updated, emit_audit_lagged, emit_feedback_given,
    emit_feedback_revoked, emit_operation_rejected, emit_validation_requested,
    emit_validation_resolved, operation_span, OperationSpan,
};
pub use service::{AgentProfile, ReputationService};
pub use session::LedgerSession;
pub use telemetry::init_tracing;

pub use reputation_state::{
    AgentId, AgentRecord, Address, FeedbackBatch, FeedbackEntry, FeedbackFilter, FeedbackInput,
    FeedbackSummary, Hash32, Ledger, LedgerError, LedgerEvent, MetadataEntry, ResponseInput,
    SequencedEvent, ValidationRecord, ValidationState, ValidationStatus, ValidationSummary,
};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
