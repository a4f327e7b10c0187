//! Per-kind buckets of pending operations awaiting block inclusion.
//!
//! Every insert deduplicates by signing-root equality, making submission
//! idempotent: inserting the same message twice leaves the pool exactly as
//! one insert does. Buckets are individually locked; no lock is held across
//! anything but map surgery.

mod attestation_storage;
mod persistence;

pub use attestation_storage::AttestationFilter;
pub use persistence::PersistedOperationPool;

use attestation_storage::AttestationMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use tree_hash::TreeHash;
use types::{
    Attestation, AttesterSlashing, Epoch, Hash256, ProposerSlashing,
    SignedBlsToExecutionChange, SignedVoluntaryExit, Slot, SyncCommitteeMessage,
    ValidatorIndex,
};

/// Upper bounds per bucket. Distinct head views multiply attestation data
/// variants, hence the larger attestation allowance.
const ATTESTATION_CAPACITY: usize = 16_384;
const EXIT_CAPACITY: usize = 1_024;
const SLASHING_CAPACITY: usize = 256;
const BLS_CHANGE_CAPACITY: usize = 1_024;
const SYNC_MESSAGE_CAPACITY: usize = 8_192;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum OpPoolError {
    /// The target bucket is at capacity.
    PoolFull,
}

/// What an insert did.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum InsertOutcome {
    Inserted,
    /// A message with this signing root (or covering it) was already present.
    AlreadyKnown,
}

#[derive(Default)]
pub struct OperationPool {
    /// Single attestations straight off the wire.
    unaggregated_attestations: RwLock<AttestationMap>,
    /// Aggregates that passed the selection-proof check.
    aggregated_attestations: RwLock<AttestationMap>,
    voluntary_exits: RwLock<HashMap<ValidatorIndex, SignedVoluntaryExit>>,
    proposer_slashings: RwLock<HashMap<ValidatorIndex, ProposerSlashing>>,
    attester_slashings: RwLock<HashMap<Hash256, AttesterSlashing>>,
    bls_to_execution_changes: RwLock<HashMap<ValidatorIndex, SignedBlsToExecutionChange>>,
    sync_committee_messages: RwLock<HashMap<(Slot, ValidatorIndex), SyncCommitteeMessage>>,
}

impl OperationPool {
    pub fn new() -> Self {
        Self::default()
    }

    /*
     * Attestations.
     */

    pub fn insert_unaggregated_attestation(
        &self,
        attestation: Attestation,
    ) -> Result<InsertOutcome, OpPoolError> {
        let mut bucket = self.unaggregated_attestations.write();
        if bucket.len() >= ATTESTATION_CAPACITY {
            return Err(OpPoolError::PoolFull);
        }
        Ok(bucket.insert_exact(attestation))
    }

    /// Inserts an aggregate, dropping it if an existing aggregate for the
    /// same data already covers its signers, and evicting aggregates the new
    /// one strictly covers.
    pub fn insert_aggregate_attestation(
        &self,
        attestation: Attestation,
    ) -> Result<InsertOutcome, OpPoolError> {
        let mut bucket = self.aggregated_attestations.write();
        if bucket.len() >= ATTESTATION_CAPACITY {
            return Err(OpPoolError::PoolFull);
        }
        Ok(bucket.insert_covering(attestation))
    }

    /// All pool attestations matching `filter`, sorted by
    /// `(data.slot, data.index)` with ties by bit count descending.
    pub fn attestations(&self, filter: &AttestationFilter) -> Vec<Attestation> {
        let mut result = self.unaggregated_attestations.read().filtered(filter);
        result.extend(self.aggregated_attestations.read().filtered(filter));
        result.sort_by(|a, b| {
            (a.data.slot, a.data.index)
                .cmp(&(b.data.slot, b.data.index))
                .then_with(|| b.num_set_bits().cmp(&a.num_set_bits()))
        });
        result
    }

    /// Attestations eligible for a block at `block_slot`: old enough to
    /// satisfy the inclusion delay, new enough to still pay, best coverage
    /// first. Aggregates take precedence over single attestations.
    pub fn attestations_for_block(
        &self,
        block_slot: Slot,
        min_inclusion_delay: u64,
        slots_per_epoch: u64,
        max_attestations: usize,
    ) -> Vec<Attestation> {
        let block_epoch = block_slot.epoch(slots_per_epoch);
        let eligible = |attestation: &Attestation| {
            let data = &attestation.data;
            data.slot + min_inclusion_delay <= block_slot
                && (data.target.epoch == block_epoch
                    || data.target.epoch + 1 == block_epoch)
        };

        let mut candidates: Vec<Attestation> = self
            .aggregated_attestations
            .read()
            .all()
            .into_iter()
            .chain(self.unaggregated_attestations.read().all())
            .filter(eligible)
            .collect();
        // Highest coverage first; stable keys keep the order deterministic.
        candidates.sort_by(|a, b| {
            b.num_set_bits()
                .cmp(&a.num_set_bits())
                .then_with(|| (a.data.slot, a.data.index).cmp(&(b.data.slot, b.data.index)))
        });
        candidates.truncate(max_attestations);
        candidates
    }

    /// Removes attestations whose target epoch can no longer be included.
    pub fn prune_attestations(&self, finalized_epoch: Epoch) {
        let before = self.num_attestations();
        self.unaggregated_attestations
            .write()
            .retain(|att| att.data.target.epoch >= finalized_epoch);
        self.aggregated_attestations
            .write()
            .retain(|att| att.data.target.epoch >= finalized_epoch);
        let pruned = before - self.num_attestations();
        if pruned > 0 {
            debug!(pruned, %finalized_epoch, "Pruned attestation pool");
        }
    }

    pub fn num_attestations(&self) -> usize {
        self.unaggregated_attestations.read().len() + self.aggregated_attestations.read().len()
    }

    /// Deletes any attestation with the given full signing root.
    pub fn delete_attestation(&self, signing_root: Hash256) {
        self.unaggregated_attestations
            .write()
            .retain(|att| att.tree_hash_root() != signing_root);
        self.aggregated_attestations
            .write()
            .retain(|att| att.tree_hash_root() != signing_root);
    }

    /*
     * Exits, slashings, credential changes, sync messages. All dedup on the
     * message's natural key and keep the first arrival.
     */

    pub fn insert_voluntary_exit(
        &self,
        exit: SignedVoluntaryExit,
    ) -> Result<InsertOutcome, OpPoolError> {
        Self::insert_keyed(
            &self.voluntary_exits,
            exit.message.validator_index,
            exit,
            EXIT_CAPACITY,
        )
    }

    pub fn insert_proposer_slashing(
        &self,
        slashing: ProposerSlashing,
    ) -> Result<InsertOutcome, OpPoolError> {
        Self::insert_keyed(
            &self.proposer_slashings,
            slashing.signed_header_1.message.proposer_index,
            slashing,
            SLASHING_CAPACITY,
        )
    }

    pub fn insert_attester_slashing(
        &self,
        slashing: AttesterSlashing,
    ) -> Result<InsertOutcome, OpPoolError> {
        let root = slashing.tree_hash_root();
        Self::insert_keyed(&self.attester_slashings, root, slashing, SLASHING_CAPACITY)
    }

    pub fn insert_bls_to_execution_change(
        &self,
        change: SignedBlsToExecutionChange,
    ) -> Result<InsertOutcome, OpPoolError> {
        Self::insert_keyed(
            &self.bls_to_execution_changes,
            change.message.validator_index,
            change,
            BLS_CHANGE_CAPACITY,
        )
    }

    pub fn insert_sync_committee_message(
        &self,
        message: SyncCommitteeMessage,
    ) -> Result<InsertOutcome, OpPoolError> {
        Self::insert_keyed(
            &self.sync_committee_messages,
            (message.slot, message.validator_index),
            message,
            SYNC_MESSAGE_CAPACITY,
        )
    }

    fn insert_keyed<K: std::hash::Hash + Eq, V>(
        bucket: &RwLock<HashMap<K, V>>,
        key: K,
        value: V,
        capacity: usize,
    ) -> Result<InsertOutcome, OpPoolError> {
        let mut map = bucket.write();
        if map.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyKnown);
        }
        if map.len() >= capacity {
            return Err(OpPoolError::PoolFull);
        }
        map.insert(key, value);
        Ok(InsertOutcome::Inserted)
    }

    /*
     * Block assembly reads.
     */

    pub fn voluntary_exits_for_block(&self, max: usize) -> Vec<SignedVoluntaryExit> {
        let mut exits: Vec<_> = self.voluntary_exits.read().values().copied().collect();
        exits.sort_by_key(|e| e.message.validator_index);
        exits.truncate(max);
        exits
    }

    pub fn proposer_slashings_for_block(&self, max: usize) -> Vec<ProposerSlashing> {
        let mut slashings: Vec<_> = self.proposer_slashings.read().values().copied().collect();
        slashings.sort_by_key(|s| s.signed_header_1.message.proposer_index);
        slashings.truncate(max);
        slashings
    }

    pub fn attester_slashings_for_block(&self, max: usize) -> Vec<AttesterSlashing> {
        let mut slashings: Vec<_> = self.attester_slashings.read().values().cloned().collect();
        slashings.sort_by_key(|s| s.tree_hash_root());
        slashings.truncate(max);
        slashings
    }

    pub fn bls_to_execution_changes_for_block(&self, max: usize) -> Vec<SignedBlsToExecutionChange> {
        let mut changes: Vec<_> = self
            .bls_to_execution_changes
            .read()
            .values()
            .copied()
            .collect();
        changes.sort_by_key(|c| c.message.validator_index);
        changes.truncate(max);
        changes
    }

    pub fn num_voluntary_exits(&self) -> usize {
        self.voluntary_exits.read().len()
    }

    pub fn num_sync_committee_messages(&self) -> usize {
        self.sync_committee_messages.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{AttestationData, Checkpoint, SignatureBytes, VoluntaryExit};

    fn attestation(slot: u64, index: u64, bits: &[usize]) -> Attestation {
        let data = AttestationData {
            slot: Slot::new(slot),
            index,
            target: Checkpoint {
                epoch: Slot::new(slot).epoch(8),
                ..Checkpoint::default()
            },
            ..AttestationData::default()
        };
        let mut att = Attestation::empty_for_signing(data, 8).unwrap();
        for bit in bits {
            att.aggregation_bits.set(*bit, true).unwrap();
        }
        att
    }

    #[test]
    fn unaggregated_insert_is_idempotent() {
        let pool = OperationPool::new();
        let att = attestation(1, 0, &[3]);
        assert_eq!(
            pool.insert_unaggregated_attestation(att.clone()),
            Ok(InsertOutcome::Inserted)
        );
        assert_eq!(
            pool.insert_unaggregated_attestation(att),
            Ok(InsertOutcome::AlreadyKnown)
        );
        assert_eq!(pool.num_attestations(), 1);
    }

    #[test]
    fn covering_aggregate_evicts_subsets() {
        let pool = OperationPool::new();
        let small = attestation(1, 0, &[1]);
        let large = attestation(1, 0, &[0, 1, 2]);

        pool.insert_aggregate_attestation(small.clone()).unwrap();
        assert_eq!(
            pool.insert_aggregate_attestation(large.clone()),
            Ok(InsertOutcome::Inserted)
        );
        // The superset replaced the subset.
        assert_eq!(pool.num_attestations(), 1);
        // Re-inserting the subset is a no-op.
        assert_eq!(
            pool.insert_aggregate_attestation(small),
            Ok(InsertOutcome::AlreadyKnown)
        );
    }

    #[test]
    fn block_inclusion_respects_delay() {
        let pool = OperationPool::new();
        pool.insert_unaggregated_attestation(attestation(9, 0, &[0]))
            .unwrap();
        pool.insert_unaggregated_attestation(attestation(10, 0, &[1]))
            .unwrap();

        let included = pool.attestations_for_block(Slot::new(10), 1, 8, 128);
        assert_eq!(included.len(), 1);
        assert_eq!(included[0].data.slot, Slot::new(9));
    }

    #[test]
    fn block_inclusion_prefers_coverage() {
        let pool = OperationPool::new();
        pool.insert_unaggregated_attestation(attestation(8, 0, &[0]))
            .unwrap();
        pool.insert_aggregate_attestation(attestation(8, 1, &[0, 1, 2]))
            .unwrap();

        let included = pool.attestations_for_block(Slot::new(10), 1, 8, 1);
        assert_eq!(included.len(), 1);
        assert_eq!(included[0].data.index, 1, "aggregate wins the single slot");
    }

    #[test]
    fn prune_by_finalized_epoch() {
        let pool = OperationPool::new();
        pool.insert_unaggregated_attestation(attestation(8, 0, &[0]))
            .unwrap(); // target epoch 1
        pool.insert_unaggregated_attestation(attestation(24, 0, &[0]))
            .unwrap(); // target epoch 3
        pool.prune_attestations(Epoch::new(2));
        assert_eq!(pool.num_attestations(), 1);
    }

    #[test]
    fn exit_dedup_by_validator() {
        let pool = OperationPool::new();
        let exit = SignedVoluntaryExit {
            message: VoluntaryExit {
                epoch: Epoch::new(1),
                validator_index: 7,
            },
            signature: SignatureBytes::empty(),
        };
        assert_eq!(
            pool.insert_voluntary_exit(exit),
            Ok(InsertOutcome::Inserted)
        );
        assert_eq!(
            pool.insert_voluntary_exit(exit),
            Ok(InsertOutcome::AlreadyKnown)
        );
        assert_eq!(pool.num_voluntary_exits(), 1);
    }

    #[test]
    fn filtered_query_sort_order() {
        let pool = OperationPool::new();
        pool.insert_unaggregated_attestation(attestation(2, 1, &[0]))
            .unwrap();
        pool.insert_unaggregated_attestation(attestation(1, 1, &[0]))
            .unwrap();
        pool.insert_unaggregated_attestation(attestation(1, 0, &[0]))
            .unwrap();

        let all = pool.attestations(&AttestationFilter::default());
        let keys: Vec<_> = all.iter().map(|a| (a.data.slot, a.data.index)).collect();
        assert_eq!(
            keys,
            vec![
                (Slot::new(1), 0),
                (Slot::new(1), 1),
                (Slot::new(2), 1)
            ]
        );
    }
}
