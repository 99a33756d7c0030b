//! Spawner configuration with hot-reload support.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Tunables for the validation spawner.
///
/// `workers` and `max_execution_time` are re-read through the
/// [`ConfigFetcher`] at each decision point and may change at runtime;
/// `cranelift` and `memory_limit_bytes` are baked into the machine
/// catalog when the spawner is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerConfig {
    /// Concurrent validation workers advertised via `room`
    /// (0 means host parallelism)
    pub workers: usize,
    /// Instantiate machines with the Cranelift backend instead of the
    /// reference interpreter
    pub cranelift: bool,
    /// Hard wall-clock ceiling per replay
    pub max_execution_time: Duration,
    /// Memory-usage level above which a replay logs a warning
    pub memory_limit_bytes: u64,
}

impl SpawnerConfig {
    /// Create a config with the default values
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: 0,
            cranelift: true,
            max_execution_time: Duration::from_secs(10 * 60),
            memory_limit_bytes: 1 << 32,
        }
    }

    /// Set the worker budget
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable/disable the Cranelift backend
    #[must_use]
    pub fn with_cranelift(mut self, cranelift: bool) -> Self {
        self.cranelift = cranelift;
        self
    }

    /// Set the execution-time ceiling
    #[must_use]
    pub fn with_max_execution_time(mut self, ceiling: Duration) -> Self {
        self.max_execution_time = ceiling;
        self
    }

    /// Set the memory warning level
    #[must_use]
    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the current configuration snapshot on demand.
///
/// The spawner never caches mutable fields beyond one decision point,
/// so swapping the fetcher's source reconfigures a running node.
pub type ConfigFetcher = Arc<dyn Fn() -> SpawnerConfig + Send + Sync>;

/// Fetcher that always returns the same configuration
#[must_use]
pub fn fixed_config(config: SpawnerConfig) -> ConfigFetcher {
    Arc::new(move || config.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpawnerConfig::new();
        assert_eq!(config.workers, 0);
        assert!(config.cranelift);
        assert_eq!(config.max_execution_time, Duration::from_secs(600));
        assert_eq!(config.memory_limit_bytes, 1 << 32);
        assert_eq!(config, SpawnerConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = SpawnerConfig::new()
            .with_workers(4)
            .with_cranelift(false)
            .with_max_execution_time(Duration::from_millis(50))
            .with_memory_limit(1024);
        assert_eq!(config.workers, 4);
        assert!(!config.cranelift);
        assert_eq!(config.max_execution_time, Duration::from_millis(50));
        assert_eq!(config.memory_limit_bytes, 1024);
    }

    #[test]
    fn test_fixed_config() {
        let fetcher = fixed_config(SpawnerConfig::new().with_workers(2));
        assert_eq!(fetcher().workers, 2);
        assert_eq!(fetcher().workers, 2);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SpawnerConfig::new().with_workers(8);
        let json = serde_json::to_string(&config).unwrap();
        let restored: SpawnerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
