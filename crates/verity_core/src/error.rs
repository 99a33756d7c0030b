//! Validation error taxonomy and fatal-fault reporting.

use crate::hash::ModuleRoot;
use crate::state::GlobalState;
use std::fmt;
use std::time::Duration;

/// Resolution of one validation run
pub type ValidationResult = Result<GlobalState, ValidationError>;

/// Errors resolved through a validation run handle.
///
/// Load and execution failures are local to the failing run and never
/// abort sibling runs. `Fatal` additionally reaches the process-wide
/// fatal sink, since it means the execution substrate itself can no
/// longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Machine binary missing, corrupt, or mismatched; retryable if the
    /// underlying cause is transient
    #[error("machine load failed: {reason}")]
    MachineLoad {
        /// What went wrong during the load
        reason: String,
    },

    /// Replay exceeded the configured wall-clock ceiling
    #[error("replay exceeded execution ceiling after {elapsed:?}")]
    Timeout {
        /// Wall-clock time spent before the run was cut off
        elapsed: Duration,
    },

    /// The replay logically failed; surfaced verbatim to the caller
    #[error("replay failed: {reason}")]
    Execution {
        /// The machine's failure description
        reason: String,
    },

    /// The run was cancelled before resolution
    #[error("validation run cancelled")]
    Cancelled,

    /// The execution substrate is no longer trustworthy
    #[error("fatal execution fault: {reason}")]
    Fatal {
        /// Description of the fault
        reason: String,
    },
}

impl ValidationError {
    /// Whether retrying the same launch can reasonably succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MachineLoad { .. })
    }
}

/// Payload written to the process-wide fatal sink when the execution
/// substrate itself is compromised. Drained by node-level supervision,
/// not by the spawner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalFault {
    /// Machine the fault was observed on, when attributable
    pub module_root: Option<ModuleRoot>,
    /// Description of the fault
    pub reason: String,
}

impl FatalFault {
    /// Create a new fatal fault
    #[must_use]
    pub fn new(module_root: Option<ModuleRoot>, reason: String) -> Self {
        Self {
            module_root,
            reason,
        }
    }
}

impl fmt::Display for FatalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.module_root {
            Some(root) => write!(f, "fatal fault on machine {}: {}", root.short(), self.reason),
            None => write!(f, "fatal fault: {}", self.reason),
        }
    }
}
