//! VERITY Replay Machines
//!
//! Loading, validation, and cataloging of WASM replay machines, plus
//! the deterministic replay execution they perform.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod image;
pub mod meter;
pub mod machine;
pub mod locator;
pub mod catalog;

pub use image::{ImageError, MAX_IMAGE_BYTES, ModuleImage};
pub use meter::MemoryMeter;
pub use machine::{MachineBackend, ReplayError, ReplayMachine, ReplayOutcome};
pub use locator::{MachineLocator, REPLAY_WASM, StaticLocator, replay_binary};
pub use catalog::{CatalogError, MachineCatalog};
