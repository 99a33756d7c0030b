//! The validation execution spawner.

use crate::execution::{ExecutionUnit, FatalSender};
use crate::metrics::{MetricsSnapshot, SpawnerMetrics};
use crate::run::ValidationRun;
use std::sync::{Arc, OnceLock};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use verity_core::{ConfigFetcher, ModuleRoot, ReplayInput};
use verity_wasm::{MachineBackend, MachineCatalog, MachineLocator};

/// Background task group scoped to the spawner's lifetime
struct TaskGroup {
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// Schedules concurrent replay executions and returns cancellable run
/// handles.
///
/// Constructed once at node startup. [`launch`] never blocks: the
/// replay runs on the background task group and resolves the returned
/// handle asynchronously. [`room`] is cooperative backpressure for
/// callers deciding how much work to submit; the spawner itself neither
/// queues nor rejects launches past it. [`stop`] cancels every
/// outstanding execution, awaits termination, and releases all cached
/// machines; a stopped spawner cannot be restarted.
///
/// [`launch`]: ValidationSpawner::launch
/// [`room`]: ValidationSpawner::room
/// [`stop`]: ValidationSpawner::stop
pub struct ValidationSpawner {
    locator: Arc<dyn MachineLocator>,
    catalog: Arc<MachineCatalog>,
    config: ConfigFetcher,
    execution: ExecutionUnit,
    metrics: Arc<SpawnerMetrics>,
    group: OnceLock<TaskGroup>,
}

impl ValidationSpawner {
    /// Construct from collaborators.
    ///
    /// Backend and memory limit are baked into the machine catalog from
    /// the current config snapshot; worker budget and execution ceiling
    /// stay hot-reloadable through the fetcher.
    #[must_use]
    pub fn new(locator: Arc<dyn MachineLocator>, config: ConfigFetcher, fatal: FatalSender) -> Self {
        let snapshot = config();
        let backend = if snapshot.cranelift {
            MachineBackend::Cranelift
        } else {
            MachineBackend::Interpreter
        };
        let catalog = Arc::new(MachineCatalog::new(
            locator.clone(),
            backend,
            snapshot.memory_limit_bytes,
        ));
        let execution = ExecutionUnit::new(catalog.clone(), fatal);
        Self {
            locator,
            catalog,
            config,
            execution,
            metrics: Arc::new(SpawnerMetrics::new()),
            group: OnceLock::new(),
        }
    }

    /// Initialize the background task group. Later calls are no-ops.
    pub fn start(&self) {
        self.group.get_or_init(|| TaskGroup {
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        });
    }

    /// Launch a replay of `input` against the machine for `module_root`.
    ///
    /// Returns immediately; failures surface through the handle's
    /// resolution. A launch on a spawner that is not started (or already
    /// stopped) resolves as cancelled.
    pub fn launch(&self, input: ReplayInput, module_root: ModuleRoot) -> ValidationRun {
        let Some(group) = self.group.get() else {
            return ValidationRun::resolved_cancelled(module_root);
        };
        if group.shutdown.is_cancelled() {
            return ValidationRun::resolved_cancelled(module_root);
        }

        tracing::debug!(
            id = input.id,
            root = %module_root.short(),
            bytes = input.total_bytes(),
            "launching validation run"
        );

        let token = group.shutdown.child_token();
        let (result_tx, result_rx) = oneshot::channel();
        let ceiling = (self.config)().max_execution_time;
        let execution = self.execution.clone();
        let metrics = self.metrics.clone();

        metrics.run_started();
        group.tracker.spawn({
            let token = token.clone();
            async move {
                let result = execution.run(input, module_root, ceiling, token).await;
                metrics.run_finished(&result);
                let _ = result_tx.send(result);
            }
        });

        ValidationRun::new(module_root, token, result_rx)
    }

    /// Advertised worker capacity: the configured budget, or host
    /// parallelism when unset. Callers use this to self-limit; launches
    /// past it are not rejected.
    #[must_use]
    pub fn room(&self) -> usize {
        let workers = (self.config)().workers;
        if workers == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            workers
        }
    }

    /// Module roots this spawner can serve
    #[must_use]
    pub fn module_roots(&self) -> Vec<ModuleRoot> {
        self.locator.module_roots()
    }

    /// The newest module root the locator advertises
    #[must_use]
    pub fn latest_module_root(&self) -> Option<ModuleRoot> {
        self.locator.latest_module_root()
    }

    /// Stable identity string distinguishing the backend configuration
    #[must_use]
    pub fn name(&self) -> String {
        match self.catalog.backend() {
            MachineBackend::Cranelift => "replay-cranelift".to_string(),
            MachineBackend::Interpreter => "replay".to_string(),
        }
    }

    /// Cancel every outstanding execution, await their termination, and
    /// release cached machines. Safe with no runs outstanding and safe
    /// to call repeatedly.
    pub async fn stop(&self) {
        if let Some(group) = self.group.get() {
            group.shutdown.cancel();
            group.tracker.close();
            group.tracker.wait().await;
        }
        self.catalog.clear().await;
        tracing::debug!("validation spawner stopped");
    }

    /// Executions currently in flight
    #[must_use]
    pub fn active_runs(&self) -> i64 {
        self.metrics.active()
    }

    /// Counters over launched runs
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The machine catalog backing this spawner
    #[must_use]
    pub fn catalog(&self) -> &MachineCatalog {
        &self.catalog
    }
}
