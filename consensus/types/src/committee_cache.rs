use crate::{
    AttestationDuty, BeaconStateError as Error, BeaconStateSnapshot, ChainSpec, CommitteeIndex,
    Epoch, Hash256, Slot, ValidatorIndex,
};
use serde::{Deserialize, Serialize};
use swap_or_not_shuffle::shuffle_list;

/// The shuffled active-index list of one epoch, plus the reverse map from
/// validator index to shuffled position.
///
/// Building the cache performs the epoch's single shuffle; every committee
/// and attester-duty lookup afterwards is a slice into it. Duty resolution
/// and template construction share one cache per epoch.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitteeCache {
    initialized_epoch: Option<Epoch>,
    shuffling: Vec<ValidatorIndex>,
    /// `shuffling_positions[validator_index]` is the validator's position in
    /// `shuffling`, or `None` if inactive this epoch.
    shuffling_positions: Vec<Option<usize>>,
    committees_per_slot: u64,
    slots_per_epoch: u64,
}

impl CommitteeCache {
    /// Builds the cache for `epoch` from the snapshot's own seed.
    pub fn initialized(
        state: &BeaconStateSnapshot,
        epoch: Epoch,
        spec: &ChainSpec,
    ) -> Result<Self, Error> {
        let seed = state.get_seed(epoch, crate::SeedDomain::Attester, spec)?;
        let active_indices = state.active_validator_indices(epoch);
        let committees_per_slot =
            BeaconStateSnapshot::committee_count_per_slot(active_indices.len(), spec);
        Self::from_seed(
            seed,
            active_indices,
            state.validators.len(),
            epoch,
            committees_per_slot,
            spec,
        )
    }

    /// Builds the cache from an externally supplied seed, the archive path
    /// for epochs whose live randao mixes are gone.
    pub fn from_seed(
        seed: Hash256,
        active_indices: Vec<ValidatorIndex>,
        registry_len: usize,
        epoch: Epoch,
        committees_per_slot: u64,
        spec: &ChainSpec,
    ) -> Result<Self, Error> {
        if active_indices.is_empty() {
            return Err(Error::EmptyValidatorSet);
        }

        let shuffling_input: Vec<usize> = active_indices.iter().map(|i| *i as usize).collect();
        let shuffling: Vec<ValidatorIndex> = shuffle_list(
            shuffling_input,
            spec.shuffle_round_count,
            seed.as_slice(),
        )
        .ok_or(Error::UnableToShuffle)?
        .into_iter()
        .map(|i| i as ValidatorIndex)
        .collect();

        let mut shuffling_positions = vec![None; registry_len];
        for (position, validator_index) in shuffling.iter().enumerate() {
            if let Some(slot) = shuffling_positions.get_mut(*validator_index as usize) {
                *slot = Some(position);
            }
        }

        Ok(Self {
            initialized_epoch: Some(epoch),
            shuffling,
            shuffling_positions,
            committees_per_slot,
            slots_per_epoch: spec.slots_per_epoch,
        })
    }

    pub fn is_initialized_at(&self, epoch: Epoch) -> bool {
        self.initialized_epoch == Some(epoch)
    }

    pub fn epoch(&self) -> Option<Epoch> {
        self.initialized_epoch
    }

    pub fn committees_per_slot(&self) -> u64 {
        self.committees_per_slot
    }

    pub fn epoch_committee_count(&self) -> u64 {
        self.committees_per_slot * self.slots_per_epoch
    }

    pub fn active_validator_count(&self) -> usize {
        self.shuffling.len()
    }

    /// The committee at `(slot, index)`, an ordered sub-slice of the
    /// shuffling.
    pub fn get_beacon_committee(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<&[ValidatorIndex], Error> {
        let epoch = self
            .initialized_epoch
            .ok_or(Error::CommitteeCacheUninitialized(None))?;
        if slot.epoch(self.slots_per_epoch) != epoch || index >= self.committees_per_slot {
            return Err(Error::NoCommittee { slot, index });
        }

        let global_index =
            (slot.as_u64() % self.slots_per_epoch) * self.committees_per_slot + index;
        let range = self.committee_range(global_index);
        Ok(&self.shuffling[range])
    }

    /// Every committee of `slot`, in index order.
    pub fn get_beacon_committees_at_slot(
        &self,
        slot: Slot,
    ) -> Result<Vec<&[ValidatorIndex]>, Error> {
        (0..self.committees_per_slot)
            .map(|index| self.get_beacon_committee(slot, index))
            .collect()
    }

    /// The attester duty of `validator_index`, or `None` when the validator
    /// is not active in the cached epoch.
    pub fn get_attestation_duties(&self, validator_index: ValidatorIndex) -> Option<AttestationDuty> {
        let epoch = self.initialized_epoch?;
        let position = (*self.shuffling_positions.get(validator_index as usize)?)?;

        let global_index = self.committee_of_position(position);
        let range = self.committee_range(global_index);

        let slot = epoch.start_slot(self.slots_per_epoch)
            + global_index / self.committees_per_slot;
        let index = global_index % self.committees_per_slot;

        Some(AttestationDuty {
            slot,
            index,
            committee_position: position - range.start,
            committee_len: range.end - range.start,
            committees_at_slot: self.committees_per_slot,
        })
    }

    /// Bounds of committee `global_index` within the shuffling: the slice
    /// `[n * i / total, n * (i + 1) / total)` under integer division.
    fn committee_range(&self, global_index: u64) -> std::ops::Range<usize> {
        let n = self.shuffling.len() as u64;
        let total = self.epoch_committee_count();
        let start = (n * global_index / total) as usize;
        let end = (n * (global_index + 1) / total) as usize;
        start..end
    }

    /// The unique committee whose range contains `position`. Committee start
    /// offsets are non-decreasing, so binary search applies.
    fn committee_of_position(&self, position: usize) -> u64 {
        let n = self.shuffling.len() as u64;
        let total = self.epoch_committee_count();
        let position = position as u64;

        // Largest `k` with `n * k / total <= position`; the loop invariant is
        // start(lo) <= position < start(hi).
        let mut lo = 0u64;
        let mut hi = total;
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if n * mid / total <= position {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }
}

/// Computes one committee directly, without building a whole-epoch cache:
/// the slice of the shuffled `active_indices` with bounds
/// `n * index / count` and `n * (index + 1) / count`.
///
/// The cache is the right tool when several committees of an epoch are
/// needed; this form serves one-shot lookups.
pub fn compute_committee(
    active_indices: &[ValidatorIndex],
    seed: &Hash256,
    index: u64,
    count: u64,
    spec: &ChainSpec,
) -> Result<Vec<ValidatorIndex>, Error> {
    if active_indices.is_empty() {
        return Err(Error::EmptyValidatorSet);
    }
    if count == 0 || index >= count {
        return Err(Error::InvalidCommitteeIndex { index, count });
    }

    let n = active_indices.len() as u64;
    let start = (n * index / count) as usize;
    let end = (n * (index + 1) / count) as usize;

    (start..end)
        .map(|position| {
            let shuffled = swap_or_not_shuffle::compute_shuffled_index(
                position,
                active_indices.len(),
                seed.as_slice(),
                spec.shuffle_round_count,
            )
            .ok_or(Error::UnableToShuffle)?;
            Ok(active_indices[shuffled])
        })
        .collect()
}
