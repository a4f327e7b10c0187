use crate::{
    BeaconStateError as Error, ChainSpec, Checkpoint, Epoch, Eth1Data, Hash256, Slot, Validator,
    ValidatorIndex,
};
use ethereum_hashing::hash_fixed;
use int_to_bytes::int_to_bytes8;
use safe_arith::SafeArith;
use serde::{Deserialize, Serialize};
use swap_or_not_shuffle::compute_shuffled_index;

/// Domain separation for the two per-epoch seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedDomain {
    Proposer,
    Attester,
}

impl SeedDomain {
    fn as_byte(&self) -> u8 {
        match self {
            SeedDomain::Proposer => 0,
            SeedDomain::Attester => 1,
        }
    }
}

/// An immutable projection of the consensus state.
///
/// Snapshots are read-only and shared behind `Arc`; the head-fetcher owns
/// their production. All reads of a single snapshot are trivially
/// linearizable because nothing here is ever mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconStateSnapshot {
    #[serde(with = "serde_utils::quoted_u64")]
    pub genesis_time: u64,
    pub slot: Slot,
    pub validators: Vec<Validator>,
    pub balances: Vec<u64>,
    /// Running RANDAO accumulator, indexed by `epoch % len`.
    pub randao_mixes: Vec<Hash256>,
    /// Recent block roots, indexed by `slot % len`.
    pub block_roots: Vec<Hash256>,
    pub finalized_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub previous_justified_checkpoint: Checkpoint,
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: Vec<Eth1Data>,
    /// Number of deposits processed into this state.
    #[serde(with = "serde_utils::quoted_u64")]
    pub eth1_deposit_index: u64,
    /// Indices of the current sync committee's members.
    pub current_sync_committee: Vec<ValidatorIndex>,
    /// Per-validator target-attestation flags for the two tracked epochs.
    pub previous_epoch_participation: Vec<bool>,
    pub current_epoch_participation: Vec<bool>,
}

impl BeaconStateSnapshot {
    pub fn current_epoch(&self, spec: &ChainSpec) -> Epoch {
        self.slot.epoch(spec.slots_per_epoch)
    }

    pub fn previous_epoch(&self, spec: &ChainSpec) -> Epoch {
        self.current_epoch(spec).saturating_sub(1_u64)
    }

    /// Indices of validators active at `epoch`, ascending.
    pub fn active_validator_indices(&self, epoch: Epoch) -> Vec<ValidatorIndex> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active_at(epoch))
            .map(|(i, _)| i as ValidatorIndex)
            .collect()
    }

    pub fn get_validator(&self, index: ValidatorIndex) -> Result<&Validator, Error> {
        self.validators
            .get(index as usize)
            .ok_or(Error::UnknownValidator(index))
    }

    /// Position of `pubkey` in the registry.
    pub fn validator_index_by_pubkey(
        &self,
        pubkey: &crate::PublicKeyBytes,
    ) -> Option<ValidatorIndex> {
        self.validators
            .iter()
            .position(|v| &v.pubkey == pubkey)
            .map(|i| i as ValidatorIndex)
    }

    pub fn get_randao_mix(&self, epoch: Epoch) -> Result<Hash256, Error> {
        if self.randao_mixes.is_empty() {
            return Err(Error::EpochOutOfBounds(epoch));
        }
        let index = (epoch.as_u64() % self.randao_mixes.len() as u64) as usize;
        Ok(self.randao_mixes[index])
    }

    /// The 32-byte shuffling seed for `epoch`:
    /// `H(randao_mix(epoch - MIN_SEED_LOOKAHEAD) || epoch_le || domain)`.
    pub fn get_seed(
        &self,
        epoch: Epoch,
        domain: SeedDomain,
        spec: &ChainSpec,
    ) -> Result<Hash256, Error> {
        let mix = self.get_randao_mix(epoch.saturating_sub(spec.min_seed_lookahead))?;
        let mut preimage = Vec::with_capacity(41);
        preimage.extend_from_slice(mix.as_slice());
        preimage.extend_from_slice(&int_to_bytes8(epoch.as_u64()));
        preimage.push(domain.as_byte());
        Ok(Hash256::from(hash_fixed(&preimage)))
    }

    /// Root of the block at `slot`, for slots within the history vector.
    pub fn get_block_root(&self, slot: Slot) -> Result<Hash256, Error> {
        let len = self.block_roots.len() as u64;
        if len == 0 || slot >= self.slot || slot.as_u64() + len < self.slot.as_u64() {
            return Err(Error::SlotOutOfBounds(slot));
        }
        Ok(self.block_roots[(slot.as_u64() % len) as usize])
    }

    /// Committees per slot at `epoch`:
    /// `clamp(1, MAX_COMMITTEES_PER_SLOT, active / SLOTS_PER_EPOCH / TARGET_COMMITTEE_SIZE)`.
    pub fn committee_count_per_slot(active_validator_count: usize, spec: &ChainSpec) -> u64 {
        std::cmp::max(
            1,
            std::cmp::min(
                spec.max_committees_per_slot,
                active_validator_count as u64 / spec.slots_per_epoch / spec.target_committee_size,
            ),
        )
    }

    /// The proposer for `slot`, drawn by effective-balance-weighted rejection
    /// sampling over the shuffled active set.
    pub fn get_beacon_proposer_index(
        &self,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<ValidatorIndex, Error> {
        let epoch = slot.epoch(spec.slots_per_epoch);
        let indices = self.active_validator_indices(epoch);
        let epoch_seed = self.get_seed(epoch, SeedDomain::Proposer, spec)?;
        let seed = slot_proposer_seed(&epoch_seed, slot);
        self.compute_proposer_index(&indices, &seed, spec)
    }

    /// Rejection-samples a proposer from `indices` with the given 32-byte
    /// seed.
    pub fn compute_proposer_index(
        &self,
        indices: &[ValidatorIndex],
        seed: &[u8; 32],
        spec: &ChainSpec,
    ) -> Result<ValidatorIndex, Error> {
        compute_proposer_index(&self.validators, indices, seed, spec)
    }

    /// The balance-weighted sum used as the participation denominator.
    pub fn total_active_balance(&self, epoch: Epoch) -> u64 {
        self.validators
            .iter()
            .filter(|v| v.is_active_at(epoch))
            .map(|v| v.effective_balance)
            .sum()
    }
}

/// Mixes `slot` into the epoch's proposer seed.
pub fn slot_proposer_seed(epoch_seed: &Hash256, slot: Slot) -> [u8; 32] {
    let mut preimage = epoch_seed.as_slice().to_vec();
    preimage.extend_from_slice(&int_to_bytes8(slot.as_u64()));
    hash_fixed(&preimage)
}

/// Rejection-samples a proposer from `indices`, weighting candidates by their
/// effective balance. Guaranteed to terminate: a candidate at the maximum
/// effective balance always passes the draw.
///
/// A free function so that archived registries (not wrapped in a snapshot)
/// can run the identical draw.
pub fn compute_proposer_index(
    validators: &[Validator],
    indices: &[ValidatorIndex],
    seed: &[u8; 32],
    spec: &ChainSpec,
) -> Result<ValidatorIndex, Error> {
    if indices.is_empty() {
        return Err(Error::EmptyValidatorSet);
    }

    const MAX_RANDOM_BYTE: u64 = u8::MAX as u64;

    let mut i = 0usize;
    loop {
        let shuffled = compute_shuffled_index(
            i % indices.len(),
            indices.len(),
            seed,
            spec.shuffle_round_count,
        )
        .ok_or(Error::UnableToShuffle)?;
        let candidate = indices[shuffled];

        let random_byte = {
            let mut preimage = seed.to_vec();
            preimage.extend_from_slice(&int_to_bytes8((i / 32) as u64));
            hash_fixed(&preimage)[i % 32]
        };

        let effective_balance = validators
            .get(candidate as usize)
            .ok_or(Error::UnknownValidator(candidate))?
            .effective_balance;
        if effective_balance.safe_mul(MAX_RANDOM_BYTE)?
            >= spec.max_effective_balance.safe_mul(random_byte as u64)?
        {
            return Ok(candidate);
        }
        i.safe_add_assign(1)?;
    }
}
