//! Global atomic counters for ledger activity.
//!
//! Counters are incremented at the service call sites. Call
//! [`Metrics::flush`] to emit current values as one `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free counters.
pub struct Metrics {
    agents_registered: AtomicU64,
    feedback_given: AtomicU64,
    feedback_revoked: AtomicU64,
    validations_requested: AtomicU64,
    validations_resolved: AtomicU64,
    operations_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub agents_registered: u64,
    pub feedback_given: u64,
    pub feedback_revoked: u64,
    pub validations_requested: u64,
    pub validations_resolved: u64,
    pub operations_rejected: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            agents_registered: AtomicU64::new(0),
            feedback_given: AtomicU64::new(0),
            feedback_revoked: AtomicU64::new(0),
            validations_requested: AtomicU64::new(0),
            validations_resolved: AtomicU64::new(0),
            operations_rejected: AtomicU64::new(0),
        }
    }

    pub fn inc_agents_registered(&self) {
        self.agents_registered.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_registered", "counter incremented");
    }

    pub fn inc_feedback_given(&self) {
        self.feedback_given.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "feedback_given", "counter incremented");
    }

    pub fn inc_feedback_revoked(&self) {
        self.feedback_revoked.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "feedback_revoked", "counter incremented");
    }

    pub fn inc_validations_requested(&self) {
        self.validations_requested.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validations_requested", "counter incremented");
    }

    pub fn inc_validations_resolved(&self) {
        self.validations_resolved.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validations_resolved", "counter incremented");
    }

    /// Any operation that returned an error.
    pub fn inc_operations_rejected(&self) {
        self.operations_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "operations_rejected", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call at natural boundaries (end of a CLI command, shutdown) rather
    /// than on every increment.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            agents_registered = s.agents_registered,
            feedback_given = s.feedback_given,
            feedback_revoked = s.feedback_revoked,
            validations_requested = s.validations_requested,
            validations_resolved = s.validations_resolved,
            operations_rejected = s.operations_rejected,
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            agents_registered: self.agents_registered.load(Ordering::Relaxed),
            feedback_given: self.feedback_given.load(Ordering::Relaxed),
            feedback_revoked: self.feedback_revoked.load(Ordering::Relaxed),
            validations_requested: self.validations_requested.load(Ordering::Relaxed),
            validations_resolved: self.validations_resolved.load(Ordering::Relaxed),
            operations_rejected: self.operations_rejected.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.agents_registered.store(0, Ordering::Relaxed);
        self.feedback_given.store(0, Ordering::Relaxed);
        self.feedback_revoked.store(0, Ordering::Relaxed);
        self.validations_requested.store(0, Ordering::Relaxed);
        self.validations_resolved.store(0, Ordering::Relaxed);
        self.operations_rejected.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());

        m.inc_agents_registered();
        m.inc_feedback_given();
        m.inc_feedback_given();
        m.inc_feedback_revoked();
        m.inc_validations_requested();
        m.inc_validations_resolved();
        m.inc_operations_rejected();
        m.inc_operations_rejected();
        m.inc_operations_rejected();

        let s = m.snapshot();
        assert_eq!(s.agents_registered, 1);
        assert_eq!(s.feedback_given, 2);
        assert_eq!(s.feedback_revoked, 1);
        assert_eq!(s.validations_requested, 1);
        assert_eq!(s.validations_resolved, 1);
        assert_eq!(s.operations_rejected, 3);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_agents_registered();
        m.inc_feedback_revoked();
        m.inc_operations_rejected();
        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }
}
