use crate::{Archive, ArchivedCommitteeInfo, BlockStore, Error};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use types::{
    ActiveSetChanges, Epoch, Hash256, SignedBeaconBlock, Slot, Validator,
    ValidatorParticipation,
};

/// An ephemeral, in-memory store backing both the archive and the block
/// index. Suitable for tests and light embedders; a database-backed store
/// implements the same traits.
#[derive(Default)]
pub struct MemoryStore {
    blocks: RwLock<HashMap<Hash256, SignedBeaconBlock>>,
    /// Slot index over `blocks`, roots sorted per slot.
    block_roots_by_slot: RwLock<BTreeMap<Slot, Vec<Hash256>>>,
    committee_info: RwLock<HashMap<Epoch, ArchivedCommitteeInfo>>,
    balances: RwLock<HashMap<Epoch, Vec<u64>>>,
    validators: RwLock<HashMap<Epoch, Vec<Validator>>>,
    participation: RwLock<HashMap<Epoch, ValidatorParticipation>>,
    active_set_changes: RwLock<HashMap<Epoch, ActiveSetChanges>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /*
     * Archive writers, called at finalization time by the archiver task.
     */

    pub fn put_archived_committee_info(&self, epoch: Epoch, info: ArchivedCommitteeInfo) {
        self.committee_info.write().insert(epoch, info);
    }

    pub fn put_archived_balances(&self, epoch: Epoch, balances: Vec<u64>) {
        self.balances.write().insert(epoch, balances);
    }

    pub fn put_archived_validators(&self, epoch: Epoch, validators: Vec<Validator>) {
        self.validators.write().insert(epoch, validators);
    }

    pub fn put_archived_participation(&self, epoch: Epoch, participation: ValidatorParticipation) {
        self.participation.write().insert(epoch, participation);
    }

    pub fn put_archived_active_set_changes(&self, epoch: Epoch, changes: ActiveSetChanges) {
        self.active_set_changes.write().insert(epoch, changes);
    }
}

impl crate::ArchiveWriter for MemoryStore {
    fn put_archived_committee_info(&self, epoch: Epoch, info: ArchivedCommitteeInfo) {
        MemoryStore::put_archived_committee_info(self, epoch, info)
    }

    fn put_archived_balances(&self, epoch: Epoch, balances: Vec<u64>) {
        MemoryStore::put_archived_balances(self, epoch, balances)
    }

    fn put_archived_validators(&self, epoch: Epoch, validators: Vec<Validator>) {
        MemoryStore::put_archived_validators(self, epoch, validators)
    }

    fn put_archived_participation(&self, epoch: Epoch, participation: ValidatorParticipation) {
        MemoryStore::put_archived_participation(self, epoch, participation)
    }

    fn put_archived_active_set_changes(&self, epoch: Epoch, changes: ActiveSetChanges) {
        MemoryStore::put_archived_active_set_changes(self, epoch, changes)
    }
}

impl Archive for MemoryStore {
    fn archived_committee_info(
        &self,
        epoch: Epoch,
    ) -> Result<Option<ArchivedCommitteeInfo>, Error> {
        Ok(self.committee_info.read().get(&epoch).cloned())
    }

    fn archived_balances(&self, epoch: Epoch) -> Result<Option<Vec<u64>>, Error> {
        Ok(self.balances.read().get(&epoch).cloned())
    }

    fn archived_validators(&self, epoch: Epoch) -> Result<Option<Vec<Validator>>, Error> {
        Ok(self.validators.read().get(&epoch).cloned())
    }

    fn archived_participation(
        &self,
        epoch: Epoch,
    ) -> Result<Option<ValidatorParticipation>, Error> {
        Ok(self.participation.read().get(&epoch).copied())
    }

    fn archived_active_set_changes(
        &self,
        epoch: Epoch,
    ) -> Result<Option<ActiveSetChanges>, Error> {
        Ok(self.active_set_changes.read().get(&epoch).cloned())
    }
}

impl BlockStore for MemoryStore {
    fn put_block(&self, root: Hash256, block: SignedBeaconBlock) -> Result<(), Error> {
        let slot = block.slot();
        let mut blocks = self.blocks.write();
        if blocks.insert(root, block).is_none() {
            let mut by_slot = self.block_roots_by_slot.write();
            let roots = by_slot.entry(slot).or_default();
            // Sorted insert keeps per-slot iteration order stable.
            let position = roots.partition_point(|r| r < &root);
            roots.insert(position, root);
        } else {
            debug!(%root, "Block overwritten in store");
        }
        Ok(())
    }

    fn get_block(&self, root: &Hash256) -> Result<Option<SignedBeaconBlock>, Error> {
        Ok(self.blocks.read().get(root).cloned())
    }

    fn blocks_by_slot(&self, slot: Slot) -> Result<Vec<(Hash256, SignedBeaconBlock)>, Error> {
        self.blocks_by_slot_range(slot, slot)
    }

    fn blocks_by_slot_range(
        &self,
        start: Slot,
        end: Slot,
    ) -> Result<Vec<(Hash256, SignedBeaconBlock)>, Error> {
        let blocks = self.blocks.read();
        let by_slot = self.block_roots_by_slot.read();
        let mut result = vec![];
        for roots in by_slot.range(start..=end).map(|(_, roots)| roots) {
            for root in roots {
                let block = blocks
                    .get(root)
                    .ok_or_else(|| Error::DatabaseError(format!("missing block {root}")))?;
                result.push((*root, block.clone()));
            }
        }
        Ok(result)
    }

    fn block_count(&self) -> usize {
        self.blocks.read().len()
    }
}
