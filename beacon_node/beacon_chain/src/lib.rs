//! Chain-facing capabilities of the validator RPC core: head snapshots, the
//! attestation template cache, eth1-data voting and the event notifier.
//!
//! Capabilities are deliberately narrow (head fetching, finalization
//! fetching, block receipt, broadcasting) and injected separately, so read
//! snapshots never entangle with write paths.

pub mod archiver;
pub mod attester_cache;
pub mod cancel;
pub mod canonical_head;
pub mod errors;
pub mod eth1_vote;
pub mod events;
pub mod test_utils;

pub use archiver::Archiver;
pub use attester_cache::{AttesterCache, AttesterCacheError};
pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use canonical_head::CanonicalHead;
pub use errors::BeaconChainError;
pub use eth1_vote::eth1_data_for_block_production;
pub use events::{ChainEvent, Notifier};

use std::sync::Arc;
use types::{
    Attestation, BeaconStateSnapshot, ChainHead, Checkpoint, Hash256, SignedBeaconBlock, Slot,
};

/// Read access to the canonical head.
pub trait HeadFetcher: Send + Sync {
    fn head_root(&self) -> Result<Hash256, BeaconChainError>;

    fn head_slot(&self) -> Result<Slot, BeaconChainError>;

    fn head_state(&self) -> Result<Arc<BeaconStateSnapshot>, BeaconChainError>;

    fn head_block(&self) -> Result<Arc<SignedBeaconBlock>, BeaconChainError>;

    /// The head summary served to validators.
    fn chain_head(&self) -> Result<ChainHead, BeaconChainError> {
        let state = self.head_state()?;
        Ok(ChainHead {
            block_root: self.head_root()?,
            block_slot: self.head_slot()?,
            finalized: state.finalized_checkpoint,
            current_justified: state.current_justified_checkpoint,
            previous_justified: state.previous_justified_checkpoint,
        })
    }
}

/// Read access to the finalized checkpoint.
pub trait FinalizationFetcher: Send + Sync {
    fn finalized_checkpoint(&self) -> Result<Checkpoint, BeaconChainError>;
}

/// Gossip egress. Payloads are SSZ bytes; topics are gossip topic names.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, topic: &str, payload: Vec<u8>);
}

/// Verdict of the block receiver on a submitted block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockVerdict {
    Accepted,
    /// The block was already known; not an error for the submitter.
    AlreadyKnown,
    Invalid(String),
}

/// Ingress into fork choice and block processing.
pub trait ChainService: Send + Sync {
    fn receive_block(&self, block: SignedBeaconBlock) -> Result<BlockVerdict, BeaconChainError>;

    /// Schedules a fork-choice observation of the attestation.
    fn receive_attestation(&self, attestation: Attestation) -> Result<(), BeaconChainError>;
}
