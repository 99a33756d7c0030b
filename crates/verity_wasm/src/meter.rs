//! Per-run memory accounting.

use serde::{Deserialize, Serialize};

/// Tracks bytes touched by one replay against a diagnostic ceiling.
///
/// The ceiling is a warning threshold, not a hard stop: the execution
/// unit logs a breach and lets the replay finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryMeter {
    limit_bytes: u64,
    current: u64,
    peak: u64,
}

impl MemoryMeter {
    /// Create a meter with the given warning level
    #[must_use]
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit_bytes,
            current: 0,
            peak: 0,
        }
    }

    /// Account bytes brought into the run
    pub fn record(&mut self, bytes: u64) {
        self.current = self.current.saturating_add(bytes);
        self.peak = self.peak.max(self.current);
    }

    /// Account bytes released by the run
    pub fn release(&mut self, bytes: u64) {
        self.current = self.current.saturating_sub(bytes);
    }

    /// Bytes currently accounted
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current
    }

    /// High-water mark over the run
    #[must_use]
    pub fn peak(&self) -> u64 {
        self.peak
    }

    /// The warning level
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit_bytes
    }

    /// Whether the high-water mark crossed the warning level
    #[must_use]
    pub fn over_limit(&self) -> bool {
        self.peak > self.limit_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tracks_peak() {
        let mut meter = MemoryMeter::new(100);
        meter.record(40);
        meter.record(30);
        assert_eq!(meter.current(), 70);
        assert_eq!(meter.peak(), 70);

        meter.release(50);
        assert_eq!(meter.current(), 20);
        assert_eq!(meter.peak(), 70);

        meter.record(10);
        assert_eq!(meter.peak(), 70);
    }

    #[test]
    fn test_over_limit() {
        let mut meter = MemoryMeter::new(100);
        meter.record(100);
        assert!(!meter.over_limit());
        meter.record(1);
        assert!(meter.over_limit());

        // the breach is sticky even after release
        meter.release(101);
        assert!(meter.over_limit());
    }

    #[test]
    fn test_release_saturates() {
        let mut meter = MemoryMeter::new(10);
        meter.release(5);
        assert_eq!(meter.current(), 0);
    }
}
