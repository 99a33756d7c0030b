//! One replay under the configured ceilings.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use verity_core::{FatalFault, ModuleRoot, ReplayInput, ValidationError, ValidationResult};
use verity_wasm::{MachineCatalog, ReplayError, ReplayMachine};

/// Sink for faults that compromise the execution substrate
pub type FatalSender = mpsc::UnboundedSender<FatalFault>;

/// Receiving side of the fatal sink, drained by node-level supervision
pub type FatalReceiver = mpsc::UnboundedReceiver<FatalFault>;

/// Create the process-wide fatal channel
#[must_use]
pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    mpsc::unbounded_channel()
}

/// Runs a single replay to completion or failure under the wall-clock
/// ceiling.
///
/// The ceiling is a hard stop: a run past the deadline resolves with a
/// timeout and its in-flight future is dropped, which releases all
/// per-run state without touching the shared machine. The memory limit
/// is a diagnostic: a breach is logged and the run continues.
#[derive(Clone)]
pub(crate) struct ExecutionUnit {
    catalog: Arc<MachineCatalog>,
    fatal: FatalSender,
}

impl ExecutionUnit {
    pub(crate) fn new(catalog: Arc<MachineCatalog>, fatal: FatalSender) -> Self {
        Self { catalog, fatal }
    }

    /// Resolve one launched run: fetch the machine, replay under the
    /// ceiling, observe cancellation throughout.
    pub(crate) async fn run(
        &self,
        input: ReplayInput,
        module_root: ModuleRoot,
        ceiling: Duration,
        token: CancellationToken,
    ) -> ValidationResult {
        tokio::select! {
            () = token.cancelled() => Err(ValidationError::Cancelled),
            result = self.run_inner(&input, module_root, ceiling, &token) => result,
        }
    }

    async fn run_inner(
        &self,
        input: &ReplayInput,
        module_root: ModuleRoot,
        ceiling: Duration,
        token: &CancellationToken,
    ) -> ValidationResult {
        let machine = self.catalog.get(module_root).await?;
        self.replay_with_deadline(&machine, input, ceiling, token)
            .await
    }

    pub(crate) async fn replay_with_deadline(
        &self,
        machine: &ReplayMachine,
        input: &ReplayInput,
        ceiling: Duration,
        token: &CancellationToken,
    ) -> ValidationResult {
        let started = Instant::now();
        let replay = AssertUnwindSafe(machine.replay(input, token)).catch_unwind();

        match tokio::time::timeout(ceiling, replay).await {
            Err(_) => {
                // downstream work observes the token at its next yield
                token.cancel();
                Err(ValidationError::Timeout {
                    elapsed: started.elapsed(),
                })
            }
            Ok(Err(panic)) => {
                let reason = format!("replay panicked: {}", panic_reason(panic.as_ref()));
                self.report_fatal(machine.module_root(), reason.clone());
                Err(ValidationError::Fatal { reason })
            }
            Ok(Ok(Err(err @ ReplayError::Corrupt { .. }))) => {
                self.report_fatal(machine.module_root(), err.to_string());
                Err(ValidationError::Fatal {
                    reason: err.to_string(),
                })
            }
            Ok(Ok(Err(err))) => Err(err.into()),
            Ok(Ok(Ok(outcome))) => {
                if outcome.peak_memory > machine.memory_limit() {
                    tracing::warn!(
                        id = input.id,
                        root = %machine.module_root().short(),
                        peak = outcome.peak_memory,
                        limit = machine.memory_limit(),
                        "replay exceeded memory usage limit"
                    );
                }
                tracing::debug!(
                    id = input.id,
                    root = %machine.module_root().short(),
                    steps = outcome.steps,
                    elapsed = ?started.elapsed(),
                    "replay complete"
                );
                Ok(outcome.state)
            }
        }
    }

    fn report_fatal(&self, root: ModuleRoot, reason: String) {
        tracing::error!(root = %root.short(), %reason, "execution substrate fault");
        let _ = self.fatal.send(FatalFault::new(Some(root), reason));
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
