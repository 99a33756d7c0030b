//! Replay request payloads.

use crate::hash::Bytes32;
use crate::state::GlobalState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One sequencer batch to replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Batch number in the inbox
    pub number: u64,
    /// Raw batch payload
    pub data: Vec<u8>,
}

/// One delayed-inbox message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedMessage {
    /// Message number in the delayed inbox
    pub number: u64,
    /// Raw message payload
    pub data: Vec<u8>,
}

/// Everything needed to deterministically replay one block.
///
/// Owned by the caller and moved into the launch; the spawner treats
/// the contents as opaque. Preimages are keyed by the BLAKE3 hash of
/// their value; the machine rejects a mismatched entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Caller-assigned request id, echoed in logs
    pub id: u64,
    /// Pre-state the replay starts from
    pub start_state: GlobalState,
    /// Sequencer batches, in inbox order
    pub batches: Vec<BatchInfo>,
    /// Delayed-inbox messages, in order
    pub delayed_messages: Vec<DelayedMessage>,
    /// Auxiliary preimages, keyed by the hash of the value
    pub preimages: BTreeMap<Bytes32, Vec<u8>>,
}

impl ReplayInput {
    /// Create an input with no batches, messages, or preimages
    #[must_use]
    pub fn new(id: u64, start_state: GlobalState) -> Self {
        Self {
            id,
            start_state,
            batches: Vec::new(),
            delayed_messages: Vec::new(),
            preimages: BTreeMap::new(),
        }
    }

    /// Append a sequencer batch
    #[must_use]
    pub fn with_batch(mut self, number: u64, data: Vec<u8>) -> Self {
        self.batches.push(BatchInfo { number, data });
        self
    }

    /// Append a delayed-inbox message
    #[must_use]
    pub fn with_delayed_message(mut self, number: u64, data: Vec<u8>) -> Self {
        self.delayed_messages.push(DelayedMessage { number, data });
        self
    }

    /// Register a preimage, keyed by its hash
    #[must_use]
    pub fn with_preimage(mut self, value: Vec<u8>) -> Self {
        self.preimages.insert(Bytes32::compute(&value), value);
        self
    }

    /// Total payload bytes carried by this input
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        let batches: u64 = self.batches.iter().map(|b| b.data.len() as u64).sum();
        let delayed: u64 = self
            .delayed_messages
            .iter()
            .map(|m| m.data.len() as u64)
            .sum();
        let preimages: u64 = self.preimages.values().map(|v| v.len() as u64).sum();
        batches + delayed + preimages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let input = ReplayInput::new(1, GlobalState::default());
        assert!(input.batches.is_empty());
        assert!(input.delayed_messages.is_empty());
        assert!(input.preimages.is_empty());
        assert_eq!(input.total_bytes(), 0);
    }

    #[test]
    fn test_with_batch_preserves_order() {
        let input = ReplayInput::new(1, GlobalState::default())
            .with_batch(4, vec![1, 2])
            .with_batch(5, vec![3]);
        assert_eq!(input.batches.len(), 2);
        assert_eq!(input.batches[0].number, 4);
        assert_eq!(input.batches[1].number, 5);
    }

    #[test]
    fn test_with_preimage_keys_by_hash() {
        let value = b"preimage value".to_vec();
        let input = ReplayInput::new(1, GlobalState::default()).with_preimage(value.clone());
        let key = Bytes32::compute(&value);
        assert_eq!(input.preimages.get(&key), Some(&value));
    }

    #[test]
    fn test_total_bytes() {
        let input = ReplayInput::new(1, GlobalState::default())
            .with_batch(0, vec![0; 10])
            .with_delayed_message(0, vec![0; 5])
            .with_preimage(vec![0; 7]);
        assert_eq!(input.total_bytes(), 22);
    }

    #[test]
    fn test_json_round_trip() {
        let input = ReplayInput::new(9, GlobalState::default())
            .with_batch(0, vec![1, 2, 3])
            .with_preimage(b"aux".to_vec());
        let json = serde_json::to_string(&input).unwrap();
        let restored: ReplayInput = serde_json::from_str(&json).unwrap();
        assert_eq!(input, restored);
    }
}
