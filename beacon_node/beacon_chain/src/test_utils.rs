//! Recording collaborator doubles shared by the workspace's tests.

use crate::{BeaconChainError, BlockVerdict, Broadcaster, ChainService};
use parking_lot::Mutex;
use types::{Attestation, SignedBeaconBlock};

/// Records every broadcast instead of gossiping it.
#[derive(Default)]
pub struct RecordingBroadcaster {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().clone()
    }

    pub fn topic_count(&self, topic: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn broadcast(&self, topic: &str, payload: Vec<u8>) {
        self.messages.lock().push((topic.to_string(), payload));
    }
}

/// A chain service that accepts everything and remembers what it saw.
#[derive(Default)]
pub struct RecordingChainService {
    blocks: Mutex<Vec<SignedBeaconBlock>>,
    attestations: Mutex<Vec<Attestation>>,
    /// Verdict returned for the next received blocks.
    verdict: Mutex<Option<BlockVerdict>>,
}

impl RecordingChainService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_verdict(&self, verdict: BlockVerdict) {
        *self.verdict.lock() = Some(verdict);
    }

    pub fn received_blocks(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn received_attestations(&self) -> usize {
        self.attestations.lock().len()
    }
}

impl ChainService for RecordingChainService {
    fn receive_block(&self, block: SignedBeaconBlock) -> Result<BlockVerdict, BeaconChainError> {
        self.blocks.lock().push(block);
        Ok(self
            .verdict
            .lock()
            .clone()
            .unwrap_or(BlockVerdict::Accepted))
    }

    fn receive_attestation(&self, attestation: Attestation) -> Result<(), BeaconChainError> {
        self.attestations.lock().push(attestation);
        Ok(())
    }
}
