//! Run accounting for introspection.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use verity_core::{ValidationError, ValidationResult};

/// Counters over launched validation runs.
///
/// The active gauge counts in-flight executions: incremented at launch,
/// decremented at resolution whatever the outcome. It is informational;
/// `room` does not consult it.
#[derive(Debug, Default)]
pub struct SpawnerMetrics {
    active: AtomicI64,
    launched: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
}

impl SpawnerMetrics {
    /// Create zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn run_started(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.launched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn run_finished(&self, result: &ValidationResult) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        match result {
            Ok(_) => self.completed.fetch_add(1, Ordering::Relaxed),
            Err(ValidationError::Timeout { .. }) => self.timed_out.fetch_add(1, Ordering::Relaxed),
            Err(ValidationError::Cancelled) => self.cancelled.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Executions currently in flight
    #[must_use]
    pub fn active(&self) -> i64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Point-in-time view of all counters
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            launched: self.launched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the spawner's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Executions in flight
    pub active: i64,
    /// Total launches
    pub launched: u64,
    /// Runs resolved successfully
    pub completed: u64,
    /// Runs resolved with a load or execution error
    pub failed: u64,
    /// Runs cut off at the execution ceiling
    pub timed_out: u64,
    /// Runs cancelled before resolution
    pub cancelled: u64,
}
