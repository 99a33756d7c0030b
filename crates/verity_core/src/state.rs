//! Claimed post-state of a replayed block.

use crate::hash::Bytes32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The output of a successful replay, claimed as the new chain state.
///
/// `batch` and `pos_in_batch` locate the execution frontier inside the
/// sequencer inbox; `send_root` accumulates outgoing messages. Produced
/// exactly once per successful execution and immutable afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    /// Hash of the last replayed block
    pub block_hash: Bytes32,
    /// Accumulator over outgoing (L2 to L1) messages
    pub send_root: Bytes32,
    /// Next inbox batch to consume
    pub batch: u64,
    /// Position inside the current batch
    pub pos_in_batch: u64,
}

impl GlobalState {
    /// Create a new global state
    #[must_use]
    pub fn new(block_hash: Bytes32, send_root: Bytes32, batch: u64, pos_in_batch: u64) -> Self {
        Self {
            block_hash,
            send_root,
            batch,
            pos_in_batch,
        }
    }

    /// Canonical hash of this state.
    ///
    /// Commits to every field with a fixed little-endian layout, so two
    /// states hash equal exactly when they are equal.
    #[must_use]
    pub fn hash(&self) -> Bytes32 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.block_hash.as_bytes());
        hasher.update(self.send_root.as_bytes());
        hasher.update(&self.batch.to_le_bytes());
        hasher.update(&self.pos_in_batch.to_le_bytes());
        Bytes32::from_bytes(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} send {} batch {} pos {}",
            self.block_hash.short(),
            self.send_root.short(),
            self.batch,
            self.pos_in_batch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> GlobalState {
        GlobalState::new(
            Bytes32::compute(b"block 1"),
            Bytes32::compute(b"sends"),
            3,
            17,
        )
    }

    #[test]
    fn test_hash_deterministic() {
        let state = sample_state();
        assert_eq!(state.hash(), state.hash());
    }

    #[test]
    fn test_hash_commits_to_every_field() {
        let base = sample_state();

        let mut changed = base;
        changed.block_hash = Bytes32::compute(b"other block");
        assert_ne!(base.hash(), changed.hash());

        let mut changed = base;
        changed.send_root = Bytes32::compute(b"other sends");
        assert_ne!(base.hash(), changed.hash());

        let mut changed = base;
        changed.batch += 1;
        assert_ne!(base.hash(), changed.hash());

        let mut changed = base;
        changed.pos_in_batch += 1;
        assert_ne!(base.hash(), changed.hash());
    }

    #[test]
    fn test_batch_and_position_do_not_collide() {
        // Swapping the two counters must change the hash
        let a = GlobalState::new(Bytes32::zero(), Bytes32::zero(), 1, 2);
        let b = GlobalState::new(Bytes32::zero(), Bytes32::zero(), 2, 1);
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_default_is_zeroed() {
        let state = GlobalState::default();
        assert!(state.block_hash.is_zero());
        assert!(state.send_root.is_zero());
        assert_eq!(state.batch, 0);
        assert_eq!(state.pos_in_batch, 0);
    }

    #[test]
    fn test_json_round_trip() {
        let state = sample_state();
        let json = serde_json::to_string(&state).unwrap();
        let restored: GlobalState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
    }

    #[test]
    fn test_display() {
        let state = sample_state();
        let s = format!("{}", state);
        assert!(s.contains("batch 3"));
        assert!(s.contains("pos 17"));
    }
}
