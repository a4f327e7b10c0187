//! Storage capabilities consumed by the query and duty layers.
//!
//! The archive is a *value source*: every getter returns owned data, never
//! handles into live caches, so historical reads cannot entangle themselves
//! with head-state lifetimes.

mod memory_store;

pub use memory_store::MemoryStore;

use serde::{Deserialize, Serialize};
use types::{
    ActiveSetChanges, Epoch, Hash256, SignedBeaconBlock, Slot, Validator, ValidatorIndex,
    ValidatorParticipation,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    DatabaseError(String),
}

/// Per-epoch committee derivation inputs persisted at finalization.
///
/// Carrying the seeds (rather than the randao mixes they derive from) keeps
/// archived duty computation independent of the head state's vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedCommitteeInfo {
    pub proposer_seed: Hash256,
    pub attester_seed: Hash256,
    /// Committees per slot in the archived epoch.
    pub committee_count: u64,
    /// Legacy sharding offset carried by archived records.
    pub start_shard: u64,
    /// Proposer of the epoch's first slot.
    pub proposer_index: ValidatorIndex,
}

/// Read access to finalized history. Implementations return `Ok(None)` when
/// an epoch was never archived; callers decide whether that is an error.
pub trait Archive: Send + Sync {
    fn archived_committee_info(&self, epoch: Epoch)
    -> Result<Option<ArchivedCommitteeInfo>, Error>;

    fn archived_balances(&self, epoch: Epoch) -> Result<Option<Vec<u64>>, Error>;

    fn archived_validators(&self, epoch: Epoch) -> Result<Option<Vec<Validator>>, Error>;

    fn archived_participation(&self, epoch: Epoch)
    -> Result<Option<ValidatorParticipation>, Error>;

    fn archived_active_set_changes(&self, epoch: Epoch)
    -> Result<Option<ActiveSetChanges>, Error>;
}

/// Write access to the archive, used by the finalization archiver.
pub trait ArchiveWriter: Send + Sync {
    fn put_archived_committee_info(&self, epoch: Epoch, info: ArchivedCommitteeInfo);

    fn put_archived_balances(&self, epoch: Epoch, balances: Vec<u64>);

    fn put_archived_validators(&self, epoch: Epoch, validators: Vec<Validator>);

    fn put_archived_participation(&self, epoch: Epoch, participation: ValidatorParticipation);

    fn put_archived_active_set_changes(&self, epoch: Epoch, changes: ActiveSetChanges);
}

/// Read/write access to the block store, indexed by root and by slot.
pub trait BlockStore: Send + Sync {
    fn put_block(&self, root: Hash256, block: SignedBeaconBlock) -> Result<(), Error>;

    fn get_block(&self, root: &Hash256) -> Result<Option<SignedBeaconBlock>, Error>;

    /// All blocks at exactly `slot`, ordered by root.
    fn blocks_by_slot(&self, slot: Slot) -> Result<Vec<(Hash256, SignedBeaconBlock)>, Error>;

    /// All blocks with `start <= slot <= end`, ordered by (slot, root).
    fn blocks_by_slot_range(
        &self,
        start: Slot,
        end: Slot,
    ) -> Result<Vec<(Hash256, SignedBeaconBlock)>, Error>;

    fn block_count(&self) -> usize;
}
