use crate::{Checkpoint, Hash256, Slot};
use serde::{Deserialize, Serialize};

/// A point-in-time view of the canonical head and finality markers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    pub block_root: Hash256,
    pub block_slot: Slot,
    pub finalized: Checkpoint,
    pub current_justified: Checkpoint,
    pub previous_justified: Checkpoint,
}
