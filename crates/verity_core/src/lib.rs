//! VERITY Core Types
//!
//! Module roots, claimed global state, replay inputs, the validation
//! error taxonomy, and spawner configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hash;
pub mod state;
pub mod input;
pub mod error;
pub mod config;

pub use hash::{Bytes32, HashError, ModuleRoot};
pub use state::GlobalState;
pub use input::{BatchInfo, DelayedMessage, ReplayInput};
pub use error::{FatalFault, ValidationError, ValidationResult};
pub use config::{ConfigFetcher, SpawnerConfig, fixed_config};
