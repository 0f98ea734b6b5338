//! Ledger configuration.
//!
//! Values come from defaults, then the environment, then explicit
//! `with_*` overrides (the CLI applies its flags this way).

use std::path::{Path, PathBuf};

use reputation_state::DEFAULT_EVENT_CAPACITY;

use crate::error::ConfigError;

/// Default snapshot location, relative to the working directory.
pub const DEFAULT_STATE_PATH: &str = ".reputation/ledger.json";

pub const ENV_STATE_PATH: &str = "REPUTATION_STATE_PATH";
pub const ENV_AUDIT_LOG: &str = "REPUTATION_AUDIT_LOG";
pub const ENV_EVENT_CAPACITY: &str = "REPUTATION_EVENT_CAPACITY";
pub const ENV_LOG_FORMAT: &str = "REPUTATION_LOG_FORMAT";

/// Configuration for opening a ledger session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Snapshot file path
    pub state_path: PathBuf,
    /// JSONL audit log of committed events (disabled when `None`)
    pub audit_log: Option<PathBuf>,
    /// Broadcast buffer per event subscriber
    pub event_capacity: usize,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            audit_log: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            json_logs: false,
        }
    }
}

impl LedgerConfig {
    /// Default configuration with the given snapshot path.
    pub fn new(state_path: impl AsRef<Path>) -> Self {
        Self {
            state_path: state_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the snapshot path
    pub fn with_state_path(mut self, path: impl AsRef<Path>) -> Self {
        self.state_path = path.as_ref().to_path_buf();
        self
    }

    /// Enable the audit log at `path`
    pub fn with_audit_log(mut self, path: impl AsRef<Path>) -> Self {
        self.audit_log = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the per-subscriber event buffer
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set JSON log output
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - REPUTATION_STATE_PATH (optional, default: ".reputation/ledger.json")
    /// - REPUTATION_AUDIT_LOG (optional, no audit log when unset)
    /// - REPUTATION_EVENT_CAPACITY (optional, default: 1024)
    /// - REPUTATION_LOG_FORMAT (optional) - set to "json" for JSON logs
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_STATE_PATH).filter(|v| !v.is_empty()) {
            config.state_path = PathBuf::from(path);
        }
        config.audit_log = lookup(ENV_AUDIT_LOG)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        if let Some(raw) = lookup(ENV_EVENT_CAPACITY) {
            config.event_capacity = raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                var: ENV_EVENT_CAPACITY,
                expected: "positive integer",
                value: raw.clone(),
            })?;
        }
        config.json_logs = lookup(ENV_LOG_FORMAT)
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.state_path, PathBuf::from(".reputation/ledger.json"));
        assert_eq!(config.event_capacity, 1024);
        assert!(config.audit_log.is_none());
        assert!(!config.json_logs);
    }

    #[test]
    fn reads_every_variable() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("REPUTATION_STATE_PATH", "/var/lib/rep/state.json"),
            ("REPUTATION_AUDIT_LOG", "/var/log/rep/audit.jsonl"),
            ("REPUTATION_EVENT_CAPACITY", "64"),
            ("REPUTATION_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.state_path, PathBuf::from("/var/lib/rep/state.json"));
        assert_eq!(
            config.audit_log,
            Some(PathBuf::from("/var/log/rep/audit.jsonl"))
        );
        assert_eq!(config.event_capacity, 64);
        assert!(config.json_logs);
    }

    #[test]
    fn rejects_bad_capacity() {
        let err = LedgerConfig::from_lookup(lookup(&[("REPUTATION_EVENT_CAPACITY", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));

        let err =
            LedgerConfig::from_lookup(lookup(&[("REPUTATION_EVENT_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity));
    }

    #[test]
    fn builders_override() {
        let config = LedgerConfig::new("a.json")
            .with_state_path("b.json")
            .with_audit_log("audit.jsonl")
            .with_event_capacity(8)
            .with_json_logs(true);
        assert_eq!(config.state_path, PathBuf::from("b.json"));
        assert_eq!(config.audit_log, Some(PathBuf::from("audit.jsonl")));
        assert_eq!(config.event_capacity, 8);
        assert!(config.json_logs);
    }
}
