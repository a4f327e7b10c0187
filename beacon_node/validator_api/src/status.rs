//! Validator status classification.

use crate::{RpcError, ValidatorApi};
use beacon_chain::HeadFetcher;
use eth1::{DepositFetcher, Eth1Backend};
use serde::{Deserialize, Serialize};
use slot_clock::SlotClock;
use types::{
    BeaconStateSnapshot, Epoch, PublicKeyBytes, Slot, ValidatorIndex, ValidatorStatus,
};

/// A classified validator, with whichever auxiliary facts the status admits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorStatusResponse {
    pub status: ValidatorStatus,
    pub validator_index: Option<ValidatorIndex>,
    pub activation_epoch: Option<Epoch>,
    /// How many validators precede this one in the activation queue.
    pub position_in_activation_queue: Option<u64>,
    /// For `DEPOSITED`: the estimated slot at which the deposit becomes
    /// includable, from follow-distance and voting-period arithmetic.
    pub expected_inclusion_slot: Option<Slot>,
    pub eth1_deposit_block_height: Option<u64>,
}

impl ValidatorStatusResponse {
    fn bare(status: ValidatorStatus) -> Self {
        Self {
            status,
            validator_index: None,
            activation_epoch: None,
            position_in_activation_queue: None,
            expected_inclusion_slot: None,
            eth1_deposit_block_height: None,
        }
    }
}

impl<C: SlotClock> ValidatorApi<C> {
    /// Classifies `pubkey` against the head state and the deposit log.
    pub fn get_validator_status(
        &self,
        pubkey: &PublicKeyBytes,
    ) -> Result<ValidatorStatusResponse, RpcError> {
        let state = self.head.head_state()?;

        let Some(index) = state.validator_index_by_pubkey(pubkey) else {
            // Not in the registry: either a deposit is in flight or the key
            // is simply unknown.
            return Ok(match self.deposits.deposit_by_pubkey(pubkey) {
                Some((_, eth1_block_height)) => ValidatorStatusResponse {
                    eth1_deposit_block_height: Some(eth1_block_height),
                    expected_inclusion_slot: Some(
                        self.estimate_inclusion_slot(&state, eth1_block_height),
                    ),
                    ..ValidatorStatusResponse::bare(ValidatorStatus::Deposited)
                },
                None => ValidatorStatusResponse::bare(ValidatorStatus::Unknown),
            });
        };

        Ok(self.status_of_index(&state, index))
    }

    /// Statuses for a batch of keys; unknown keys classify as `UNKNOWN`
    /// rather than failing the batch.
    pub fn get_validator_statuses(
        &self,
        pubkeys: &[PublicKeyBytes],
    ) -> Result<Vec<ValidatorStatusResponse>, RpcError> {
        pubkeys
            .iter()
            .map(|pubkey| self.get_validator_status(pubkey))
            .collect()
    }

    pub(crate) fn status_of_index(
        &self,
        state: &BeaconStateSnapshot,
        index: ValidatorIndex,
    ) -> ValidatorStatusResponse {
        let validator = &state.validators[index as usize];
        let current_epoch = state.current_epoch(&self.spec);
        let far_future = self.spec.far_future_epoch;

        let status = if current_epoch < validator.activation_epoch {
            ValidatorStatus::Pending
        } else if validator.exit_epoch == far_future {
            ValidatorStatus::Active
        } else if current_epoch >= validator.withdrawable_epoch {
            ValidatorStatus::Withdrawable
        } else if validator.slashed && current_epoch >= validator.exit_epoch {
            ValidatorStatus::ExitedSlashed
        } else if current_epoch >= validator.exit_epoch {
            ValidatorStatus::Exited
        } else {
            ValidatorStatus::Exiting
        };

        let position_in_activation_queue = (status == ValidatorStatus::Pending)
            .then(|| self.activation_queue_position(state, index, current_epoch));

        ValidatorStatusResponse {
            status,
            validator_index: Some(index),
            activation_epoch: (validator.activation_epoch != far_future)
                .then_some(validator.activation_epoch),
            position_in_activation_queue,
            expected_inclusion_slot: None,
            eth1_deposit_block_height: None,
        }
    }

    /// `index - last_activated_index`: how deep in the activation queue this
    /// validator stands.
    fn activation_queue_position(
        &self,
        state: &BeaconStateSnapshot,
        index: ValidatorIndex,
        current_epoch: Epoch,
    ) -> u64 {
        let last_activated = state
            .validators
            .iter()
            .rposition(|v| v.activation_epoch <= current_epoch);
        match last_activated {
            Some(last) => index.saturating_sub(last as u64),
            None => index + 1,
        }
    }

    /// Expected inclusion slot of a deposit observed at `deposit_height`:
    /// the eth1 chain must advance past the follow distance, then the next
    /// voting period must elect a block covering it.
    fn estimate_inclusion_slot(&self, state: &BeaconStateSnapshot, deposit_height: u64) -> Slot {
        let spec = &self.spec;
        let current_height = self.eth1.latest_block_height().unwrap_or(deposit_height);
        let blocks_until_followed = (deposit_height + spec.eth1_follow_distance)
            .saturating_sub(current_height);
        let seconds_until_followed = blocks_until_followed * spec.seconds_per_eth1_block;

        let voting_period_slots = spec.epochs_per_eth1_voting_period * spec.slots_per_epoch;
        let voting_period_seconds = voting_period_slots * spec.seconds_per_slot;

        // One full voting period after the deposit becomes followed.
        let eta_slots = (seconds_until_followed + voting_period_seconds) / spec.seconds_per_slot;
        state.slot + eta_slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::{ChainSpec, DepositContainer, DepositData, SignatureBytes};
    use types::test_utils::deterministic_pubkey;

    /// Scenario fixtures walk one validator through the whole ladder.
    fn harness_with_validator(
        current_epoch: u64,
        activation: u64,
        exit: Option<u64>,
        withdrawable: Option<u64>,
        slashed: bool,
    ) -> TestHarness {
        let spec = ChainSpec::minimal();
        let far_future = spec.far_future_epoch;
        TestHarness::build_with(16, &spec, |builder| {
            builder.state_mut().slot =
                Epoch::new(current_epoch).start_slot(spec.slots_per_epoch);
            let v = &mut builder.state_mut().validators[0];
            v.activation_epoch = Epoch::new(activation);
            v.exit_epoch = exit.map(Epoch::new).unwrap_or(far_future);
            v.withdrawable_epoch = withdrawable.map(Epoch::new).unwrap_or(far_future);
            v.slashed = slashed;
        })
    }

    fn status_of(harness: &TestHarness, index: u64) -> ValidatorStatus {
        let pubkey = deterministic_pubkey(index);
        harness.api.get_validator_status(&pubkey).unwrap().status
    }

    #[test]
    fn status_ladder() {
        // activation_epoch=5, current=3: PENDING.
        let h = harness_with_validator(3, 5, None, None, false);
        assert_eq!(status_of(&h, 0), ValidatorStatus::Pending);

        // Same validator at epoch 5: ACTIVE.
        let h = harness_with_validator(5, 5, None, None, false);
        assert_eq!(status_of(&h, 0), ValidatorStatus::Active);

        // exit_epoch=10, withdrawable=12, current=9: EXITING.
        let h = harness_with_validator(9, 5, Some(10), Some(12), false);
        assert_eq!(status_of(&h, 0), ValidatorStatus::Exiting);

        // current=10, at the exit epoch: EXITED.
        let h = harness_with_validator(10, 5, Some(10), Some(12), false);
        assert_eq!(status_of(&h, 0), ValidatorStatus::Exited);

        // Slashed at the exit epoch: EXITED_SLASHED.
        let h = harness_with_validator(10, 5, Some(10), Some(12), true);
        assert_eq!(status_of(&h, 0), ValidatorStatus::ExitedSlashed);

        // current=12, past withdrawable: WITHDRAWABLE.
        let h = harness_with_validator(12, 5, Some(10), Some(12), false);
        assert_eq!(status_of(&h, 0), ValidatorStatus::Withdrawable);
    }

    #[test]
    fn unknown_key_without_deposit() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(4, &spec);
        let response = harness
            .api
            .get_validator_status(&deterministic_pubkey(777))
            .unwrap();
        assert_eq!(response.status, ValidatorStatus::Unknown);
        assert_eq!(response.validator_index, None);
    }

    #[test]
    fn deposited_key_reports_inclusion_estimate() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(4, &spec);
        let pubkey = deterministic_pubkey(777);
        harness
            .eth1
            .insert_deposit_log(DepositContainer {
                index: 0,
                deposit_data: DepositData {
                    pubkey,
                    withdrawal_credentials: Default::default(),
                    amount: 32_000_000_000,
                    signature: SignatureBytes::empty(),
                },
                eth1_block_height: 50,
            })
            .unwrap();

        let response = harness.api.get_validator_status(&pubkey).unwrap();
        assert_eq!(response.status, ValidatorStatus::Deposited);
        assert_eq!(response.eth1_deposit_block_height, Some(50));
        let eta = response.expected_inclusion_slot.unwrap();
        assert!(eta > harness.head_state().slot);
    }

    #[test]
    fn pending_queue_position_counts_from_last_activated() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::build_with(10, &spec, |builder| {
            builder.state_mut().slot = Epoch::new(1).start_slot(spec.slots_per_epoch);
            // Validators 7, 8, 9 still pending.
            for index in 7..10 {
                builder.state_mut().validators[index].activation_epoch = Epoch::new(9);
            }
        });

        let response = harness
            .api
            .get_validator_status(&deterministic_pubkey(8))
            .unwrap();
        assert_eq!(response.status, ValidatorStatus::Pending);
        // Last activated index is 6; validator 8 is 2 behind it.
        assert_eq!(response.position_in_activation_queue, Some(2));
    }
}
