//! Deterministic state fixtures for tests across the workspace.

use crate::{
    BeaconStateSnapshot, ChainSpec, Checkpoint, Epoch, Eth1Data, FixedBytesExtended, Hash256,
    PublicKeyBytes, Slot, Validator,
};

/// A unique, deterministic 48-byte key for `index`. Purely an identifier;
/// these bytes are not on the BLS curve.
pub fn deterministic_pubkey(index: u64) -> PublicKeyBytes {
    let mut bytes = [0_u8; crate::PUBLIC_KEY_BYTES_LEN];
    bytes[0..8].copy_from_slice(&index.to_le_bytes());
    bytes[47] = 0xc0;
    PublicKeyBytes::from(bytes)
}

/// Builds snapshots with a registry of genesis-active validators at the
/// maximum effective balance, distinct randao mixes and block roots.
pub struct TestingStateBuilder {
    state: BeaconStateSnapshot,
}

impl TestingStateBuilder {
    pub fn new(validator_count: usize, spec: &ChainSpec) -> Self {
        let validators: Vec<Validator> = (0..validator_count as u64)
            .map(|index| Validator {
                pubkey: deterministic_pubkey(index),
                activation_eligibility_epoch: Epoch::new(0),
                activation_epoch: Epoch::new(0),
                exit_epoch: spec.far_future_epoch,
                withdrawable_epoch: spec.far_future_epoch,
                slashed: false,
                effective_balance: spec.max_effective_balance,
            })
            .collect();

        let balances = vec![spec.max_effective_balance; validator_count];

        let randao_mixes = (0..spec.epochs_per_historical_vector)
            .map(|i| Hash256::from_low_u64_be(i + 1))
            .collect();
        let block_roots = (0..spec.slots_per_historical_root)
            .map(|i| Hash256::from_low_u64_le(i + 1))
            .collect();

        let current_sync_committee = (0..validator_count as u64)
            .cycle()
            .take(spec.sync_committee_size as usize)
            .collect();

        Self {
            state: BeaconStateSnapshot {
                genesis_time: 1_606_824_023,
                slot: Slot::new(0),
                validators,
                balances,
                randao_mixes,
                block_roots,
                finalized_checkpoint: Checkpoint::default(),
                current_justified_checkpoint: Checkpoint::default(),
                previous_justified_checkpoint: Checkpoint::default(),
                eth1_data: Eth1Data::default(),
                eth1_data_votes: vec![],
                eth1_deposit_index: 0,
                current_sync_committee,
                previous_epoch_participation: vec![true; validator_count],
                current_epoch_participation: vec![true; validator_count],
            },
        }
    }

    pub fn at_slot(mut self, slot: Slot) -> Self {
        self.state.slot = slot;
        self
    }

    pub fn with_finalized(mut self, epoch: Epoch, root: Hash256) -> Self {
        self.state.finalized_checkpoint = Checkpoint { epoch, root };
        self
    }

    pub fn with_justified(mut self, epoch: Epoch, root: Hash256) -> Self {
        self.state.current_justified_checkpoint = Checkpoint { epoch, root };
        self
    }

    pub fn with_eth1_data(mut self, eth1_data: Eth1Data) -> Self {
        self.state.eth1_data = eth1_data;
        self
    }

    pub fn with_eth1_data_votes(mut self, votes: Vec<Eth1Data>) -> Self {
        self.state.eth1_data_votes = votes;
        self
    }

    pub fn with_participation(mut self, participated: Vec<bool>) -> Self {
        self.state.current_epoch_participation = participated.clone();
        self.state.previous_epoch_participation = participated;
        self
    }

    /// Mutable access for fixtures the builder methods don't cover.
    pub fn state_mut(&mut self) -> &mut BeaconStateSnapshot {
        &mut self.state
    }

    pub fn build(self) -> BeaconStateSnapshot {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pubkeys_are_unique() {
        let keys: std::collections::HashSet<_> =
            (0..1000).map(deterministic_pubkey).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn builder_produces_fully_active_registry() {
        let spec = ChainSpec::minimal();
        let state = TestingStateBuilder::new(16, &spec).build();
        assert_eq!(state.active_validator_indices(Epoch::new(0)).len(), 16);
        assert_eq!(state.balances.len(), 16);
    }
}
