//! Loaded replay machines and the deterministic replay they perform.

use crate::image::ModuleImage;
use crate::meter::MemoryMeter;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use verity_core::{
    BatchInfo, Bytes32, DelayedMessage, GlobalState, ModuleRoot, ReplayInput, ValidationError,
};

/// Machine instantiation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineBackend {
    /// Reference interpreter
    Interpreter,
    /// Cranelift-optimized backend
    Cranelift,
}

impl MachineBackend {
    /// Short identifier used in spawner names
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Interpreter => "interp",
            Self::Cranelift => "cranelift",
        }
    }
}

/// Replay-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// Input cannot drive the machine through a full block
    #[error("invalid replay input: {0}")]
    InvalidInput(String),

    /// A preimage does not hash to its key
    #[error("preimage {key} does not match its hash")]
    PreimageMismatch {
        /// The offending preimage key
        key: Bytes32,
    },

    /// Cancelled mid-run
    #[error("replay interrupted")]
    Interrupted,

    /// The machine's module no longer hashes to its root
    #[error("machine integrity failure on module {expected}")]
    Corrupt {
        /// Root the module was loaded for
        expected: ModuleRoot,
    },
}

impl From<ReplayError> for ValidationError {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::Interrupted => Self::Cancelled,
            ReplayError::Corrupt { .. } => Self::Fatal {
                reason: err.to_string(),
            },
            other => Self::Execution {
                reason: other.to_string(),
            },
        }
    }
}

/// Result of one successful replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOutcome {
    /// Claimed post-state
    pub state: GlobalState,
    /// Inbox messages stepped through
    pub steps: u64,
    /// Peak bytes accounted during the run
    pub peak_memory: u64,
}

/// A loaded replay machine bound to one module root.
///
/// Expensive to construct, cheap to reuse. Machines are immutable once
/// constructed: [`replay`] builds all mutable state per run, so a single
/// instance is safely shared across concurrent replays behind an `Arc`.
/// The catalog relies on this and does not serialize access per machine.
///
/// [`replay`]: ReplayMachine::replay
#[derive(Debug)]
pub struct ReplayMachine {
    image: ModuleImage,
    backend: MachineBackend,
    memory_limit: u64,
}

impl ReplayMachine {
    /// Instantiate a machine over a validated module image
    #[must_use]
    pub fn new(image: ModuleImage, backend: MachineBackend, memory_limit: u64) -> Self {
        Self {
            image,
            backend,
            memory_limit,
        }
    }

    /// The module root this machine serves
    #[must_use]
    pub fn module_root(&self) -> ModuleRoot {
        self.image.root()
    }

    /// The backend this machine was instantiated with
    #[must_use]
    pub fn backend(&self) -> MachineBackend {
        self.backend
    }

    /// The memory warning level for runs on this machine
    #[must_use]
    pub fn memory_limit(&self) -> u64 {
        self.memory_limit
    }

    /// Deterministically replay one block against this machine.
    ///
    /// The transition is a pure function of the module root and the
    /// input, so any two runs over the same pair produce the same
    /// outcome regardless of backend or interleaving. The run yields
    /// between inbox messages; cancellation is observed at the next
    /// yield point and resolves to [`ReplayError::Interrupted`].
    ///
    /// # Errors
    ///
    /// Returns error if the input is malformed, the run is interrupted,
    /// or the module fails its integrity check.
    pub async fn replay(
        &self,
        input: &ReplayInput,
        token: &CancellationToken,
    ) -> Result<ReplayOutcome, ReplayError> {
        if !self.image.verify() {
            return Err(ReplayError::Corrupt {
                expected: self.image.root(),
            });
        }
        if input.batches.is_empty() {
            return Err(ReplayError::InvalidInput(
                "no batches to replay".to_string(),
            ));
        }
        for (key, value) in &input.preimages {
            if Bytes32::compute(value) != *key {
                return Err(ReplayError::PreimageMismatch { key: *key });
            }
        }

        let mut meter = MemoryMeter::new(self.memory_limit);
        for value in input.preimages.values() {
            meter.record(value.len() as u64);
        }

        let mut state = input.start_state;
        let mut steps = 0u64;

        for batch in &input.batches {
            if token.is_cancelled() {
                return Err(ReplayError::Interrupted);
            }
            state = self.step_batch(&state, batch);
            meter.record(batch.data.len() as u64);
            steps += 1;
            tokio::task::yield_now().await;
        }

        for message in &input.delayed_messages {
            if token.is_cancelled() {
                return Err(ReplayError::Interrupted);
            }
            state = self.step_delayed(&state, message);
            meter.record(message.data.len() as u64);
            steps += 1;
            tokio::task::yield_now().await;
        }

        Ok(ReplayOutcome {
            state,
            steps,
            peak_memory: meter.peak(),
        })
    }

    fn step_batch(&self, state: &GlobalState, batch: &BatchInfo) -> GlobalState {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"verity:batch");
        hasher.update(self.image.root().as_bytes());
        hasher.update(state.hash().as_bytes());
        hasher.update(&batch.number.to_le_bytes());
        hasher.update(&batch.data);
        let block_hash = Bytes32::from_bytes(*hasher.finalize().as_bytes());

        GlobalState {
            block_hash,
            send_root: fold_send_root(state.send_root, block_hash),
            batch: batch.number + 1,
            pos_in_batch: 0,
        }
    }

    fn step_delayed(&self, state: &GlobalState, message: &DelayedMessage) -> GlobalState {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"verity:delayed");
        hasher.update(self.image.root().as_bytes());
        hasher.update(state.hash().as_bytes());
        hasher.update(&message.number.to_le_bytes());
        hasher.update(&message.data);
        let block_hash = Bytes32::from_bytes(*hasher.finalize().as_bytes());

        GlobalState {
            block_hash,
            send_root: fold_send_root(state.send_root, block_hash),
            batch: state.batch,
            pos_in_batch: state.pos_in_batch + 1,
        }
    }
}

fn fold_send_root(send_root: Bytes32, block_hash: Bytes32) -> Bytes32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"verity:send");
    hasher.update(send_root.as_bytes());
    hasher.update(block_hash.as_bytes());
    Bytes32::from_bytes(*hasher.finalize().as_bytes())
}
