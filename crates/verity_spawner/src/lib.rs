//! VERITY Validation Spawner
//!
//! Concurrent, cancellable replay execution against cataloged machines:
//! admission introspection, per-run ceilings, and global shutdown.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod run;
pub mod execution;
pub mod metrics;
pub mod spawner;

pub use run::ValidationRun;
pub use execution::{FatalReceiver, FatalSender, fatal_channel};
pub use metrics::{MetricsSnapshot, SpawnerMetrics};
pub use spawner::ValidationSpawner;
