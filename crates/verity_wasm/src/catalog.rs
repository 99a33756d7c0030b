//! Machine catalog: one loaded replay machine per module root.

use crate::image::ModuleImage;
use crate::locator::MachineLocator;
use crate::machine::{MachineBackend, ReplayMachine};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, OnceCell};
use verity_core::{ModuleRoot, ValidationError};

/// Catalog load errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The locator does not know this root
    #[error("unknown module root {0}")]
    UnknownModuleRoot(ModuleRoot),

    /// The binary could not be read
    #[error("cannot read module binary at {path}: {reason}")]
    Unreadable {
        /// Path the locator resolved
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// The binary failed validation
    #[error(transparent)]
    Invalid(#[from] crate::image::ImageError),
}

impl From<CatalogError> for ValidationError {
    fn from(err: CatalogError) -> Self {
        Self::MachineLoad {
            reason: err.to_string(),
        }
    }
}

type MachineCell = Arc<OnceCell<Arc<ReplayMachine>>>;

/// Loads and caches one replay machine per module root.
///
/// The first access for a root performs the expensive load; concurrent
/// first access is single-flight: one load runs and waiters share its
/// result. A failed load is not cached, so a later call retries. Backend
/// and memory limit are baked in at construction and cannot change
/// without reconstructing the catalog. Machines live until [`clear`]
/// (spawner shutdown); module roots number in the single digits per
/// node, so there is no eviction.
///
/// [`clear`]: MachineCatalog::clear
pub struct MachineCatalog {
    locator: Arc<dyn MachineLocator>,
    backend: MachineBackend,
    memory_limit: u64,
    cells: Mutex<HashMap<ModuleRoot, MachineCell>>,
    loads: AtomicU64,
}

impl MachineCatalog {
    /// Create a catalog over a locator
    #[must_use]
    pub fn new(locator: Arc<dyn MachineLocator>, backend: MachineBackend, memory_limit: u64) -> Self {
        Self {
            locator,
            backend,
            memory_limit,
            cells: Mutex::new(HashMap::new()),
            loads: AtomicU64::new(0),
        }
    }

    /// The backend machines are instantiated with
    #[must_use]
    pub fn backend(&self) -> MachineBackend {
        self.backend
    }

    /// A ready machine for the given root, loading it on first access
    ///
    /// # Errors
    ///
    /// Returns error if the root is unknown or the binary is unreadable
    /// or invalid
    pub async fn get(&self, root: ModuleRoot) -> Result<Arc<ReplayMachine>, CatalogError> {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(root).or_default().clone()
        };
        let machine = cell.get_or_try_init(|| self.load(root)).await?;
        Ok(machine.clone())
    }

    async fn load(&self, root: ModuleRoot) -> Result<Arc<ReplayMachine>, CatalogError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let path = self
            .locator
            .path_for(root)
            .ok_or(CatalogError::UnknownModuleRoot(root))?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| CatalogError::Unreadable {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        let image = ModuleImage::parse_expected(bytes, root)?;
        tracing::debug!(root = %root.short(), size = image.size(), "loaded replay machine");
        Ok(Arc::new(ReplayMachine::new(
            image,
            self.backend,
            self.memory_limit,
        )))
    }

    /// Roots with a machine currently cached
    pub async fn loaded(&self) -> Vec<ModuleRoot> {
        let cells = self.cells.lock().await;
        cells
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(root, _)| *root)
            .collect()
    }

    /// Number of load attempts performed so far
    #[must_use]
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    /// Release every cached machine
    pub async fn clear(&self) {
        let mut cells = self.cells.lock().await;
        let released = cells.len();
        cells.clear();
        if released > 0 {
            tracing::debug!(released, "cleared machine catalog");
        }
    }
}
