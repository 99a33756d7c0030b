//! Module-root location.

use std::path::{Path, PathBuf};
use verity_core::ModuleRoot;

/// File name of the replay binary inside a module-root directory
pub const REPLAY_WASM: &str = "replay.wasm";

/// Resolve the replay binary path inside a module-root directory
#[must_use]
pub fn replay_binary(dir: &Path) -> PathBuf {
    dir.join(REPLAY_WASM)
}

/// Resolves which module roots exist and where their binaries live.
///
/// The production locator scans an artifact directory and belongs to
/// node wiring; the catalog only depends on this seam. A root the
/// locator cannot resolve surfaces as a machine-load error.
pub trait MachineLocator: Send + Sync {
    /// All module roots this locator can serve, oldest first
    fn module_roots(&self) -> Vec<ModuleRoot>;

    /// Path of the replay binary for a root, if known
    fn path_for(&self, root: ModuleRoot) -> Option<PathBuf>;

    /// The newest root this locator advertises
    fn latest_module_root(&self) -> Option<ModuleRoot> {
        self.module_roots().last().copied()
    }
}

/// In-memory locator backed by an explicit root-to-path map.
///
/// Entries keep insertion order, so the last registered root is the
/// latest.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    entries: Vec<(ModuleRoot, PathBuf)>,
}

impl StaticLocator {
    /// Create an empty locator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module root and its binary path
    #[must_use]
    pub fn with_module(mut self, root: ModuleRoot, path: PathBuf) -> Self {
        self.insert(root, path);
        self
    }

    /// Register a module root and its binary path
    pub fn insert(&mut self, root: ModuleRoot, path: PathBuf) {
        self.entries.retain(|(existing, _)| *existing != root);
        self.entries.push((root, path));
    }

    /// Number of registered roots
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no roots are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MachineLocator for StaticLocator {
    fn module_roots(&self) -> Vec<ModuleRoot> {
        self.entries.iter().map(|(root, _)| *root).collect()
    }

    fn path_for(&self, root: ModuleRoot) -> Option<PathBuf> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == root)
            .map(|(_, path)| path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_core::Bytes32;

    #[test]
    fn test_replay_binary() {
        let path = replay_binary(Path::new("/machines/abcd"));
        assert_eq!(path, PathBuf::from("/machines/abcd/replay.wasm"));
    }

    #[test]
    fn test_static_locator_lookup() {
        let root_a = Bytes32::compute(b"a");
        let root_b = Bytes32::compute(b"b");
        let locator = StaticLocator::new()
            .with_module(root_a, PathBuf::from("/a/replay.wasm"))
            .with_module(root_b, PathBuf::from("/b/replay.wasm"));

        assert_eq!(locator.len(), 2);
        assert_eq!(locator.module_roots(), vec![root_a, root_b]);
        assert_eq!(locator.path_for(root_a), Some(PathBuf::from("/a/replay.wasm")));
        assert_eq!(locator.path_for(Bytes32::compute(b"unknown")), None);
    }

    #[test]
    fn test_latest_module_root_is_last_inserted() {
        let root_a = Bytes32::compute(b"a");
        let root_b = Bytes32::compute(b"b");
        let locator = StaticLocator::new()
            .with_module(root_a, PathBuf::from("/a"))
            .with_module(root_b, PathBuf::from("/b"));
        assert_eq!(locator.latest_module_root(), Some(root_b));

        assert_eq!(StaticLocator::new().latest_module_root(), None);
    }

    #[test]
    fn test_insert_replaces_existing_root() {
        let root = Bytes32::compute(b"a");
        let mut locator = StaticLocator::new();
        locator.insert(root, PathBuf::from("/old"));
        locator.insert(root, PathBuf::from("/new"));
        assert_eq!(locator.len(), 1);
        assert_eq!(locator.path_for(root), Some(PathBuf::from("/new")));
    }
}
