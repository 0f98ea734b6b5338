//! Service-level error taxonomy.

use reputation_state::LedgerError;

/// Errors produced by configuration parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid {expected}: {value:?}")]
    InvalidVar {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("event capacity must be positive")]
    ZeroCapacity,
}

/// Reputation service errors.
#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("audit log error: {0}")]
    Audit(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReputationError {
    /// The wrapped ledger error, if this came from a ledger operation.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            ReputationError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for reputation service operations.
pub type Result<T> = std::result::Result<T, ReputationError>;
