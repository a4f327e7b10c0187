use crate::Epoch;
use std::time::Duration;

/// Runtime configuration of the consensus core.
///
/// Every field is required; there is no runtime negotiation. The two
/// constructors mirror the mainnet and minimal presets.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSpec {
    /*
     * Time parameters.
     */
    pub slots_per_epoch: u64,
    pub seconds_per_slot: u64,
    pub seconds_per_eth1_block: u64,
    pub min_attestation_inclusion_delay: u64,
    pub min_seed_lookahead: Epoch,
    pub min_validator_withdrawability_delay: Epoch,
    /*
     * Eth1 voting.
     */
    pub epochs_per_eth1_voting_period: u64,
    pub eth1_follow_distance: u64,
    pub eth1_data_timeout: Duration,
    /*
     * Committees and shuffling.
     */
    pub max_committees_per_slot: u64,
    pub target_committee_size: u64,
    pub shuffle_round_count: u8,
    pub target_aggregators_per_committee: u64,
    pub sync_committee_size: u64,
    pub epochs_per_sync_committee_period: u64,
    /*
     * Registry and balances.
     */
    pub max_effective_balance: u64,
    pub min_per_epoch_churn_limit: u64,
    pub churn_limit_quotient: u64,
    pub far_future_epoch: Epoch,
    /*
     * State vector lengths.
     */
    pub epochs_per_historical_vector: u64,
    pub slots_per_historical_root: u64,
    /*
     * Deposits.
     */
    pub max_deposits: u64,
    pub deposit_contract_tree_depth: usize,
    /*
     * Query engine.
     */
    pub max_page_size: usize,
    pub default_page_size: usize,
    /*
     * Streams.
     */
    pub activation_poll_interval: Duration,
}

impl ChainSpec {
    /// The mainnet preset.
    pub fn mainnet() -> Self {
        Self {
            slots_per_epoch: 32,
            seconds_per_slot: 12,
            seconds_per_eth1_block: 14,
            min_attestation_inclusion_delay: 1,
            min_seed_lookahead: Epoch::new(1),
            min_validator_withdrawability_delay: Epoch::new(256),
            epochs_per_eth1_voting_period: 64,
            eth1_follow_distance: 2048,
            eth1_data_timeout: Duration::from_secs(2),
            max_committees_per_slot: 64,
            target_committee_size: 128,
            shuffle_round_count: 90,
            target_aggregators_per_committee: 16,
            sync_committee_size: 512,
            epochs_per_sync_committee_period: 256,
            max_effective_balance: 32_000_000_000,
            min_per_epoch_churn_limit: 4,
            churn_limit_quotient: 65_536,
            far_future_epoch: Epoch::max_value(),
            epochs_per_historical_vector: 65_536,
            slots_per_historical_root: 8_192,
            max_deposits: 16,
            deposit_contract_tree_depth: 32,
            max_page_size: 250,
            default_page_size: 250,
            activation_poll_interval: Duration::from_secs(6),
        }
    }

    /// The minimal preset, sized for tests.
    pub fn minimal() -> Self {
        Self {
            slots_per_epoch: 8,
            seconds_per_slot: 6,
            seconds_per_eth1_block: 14,
            min_seed_lookahead: Epoch::new(1),
            min_validator_withdrawability_delay: Epoch::new(256),
            epochs_per_eth1_voting_period: 4,
            eth1_follow_distance: 16,
            max_committees_per_slot: 4,
            target_committee_size: 4,
            shuffle_round_count: 10,
            target_aggregators_per_committee: 16,
            sync_committee_size: 32,
            epochs_per_sync_committee_period: 8,
            churn_limit_quotient: 32,
            epochs_per_historical_vector: 64,
            slots_per_historical_root: 64,
            ..ChainSpec::mainnet()
        }
    }

    /// Slot at which the epoch's eth1 voting period started.
    pub fn eth1_voting_period_start_slot(&self, slot: crate::Slot) -> crate::Slot {
        let slots_per_period = self.epochs_per_eth1_voting_period * self.slots_per_epoch;
        crate::Slot::new(slot.as_u64() - slot.as_u64() % slots_per_period)
    }

    /// Epoch at which activations and exits initiated at `epoch` take effect.
    pub fn compute_activation_exit_epoch(&self, epoch: Epoch) -> Epoch {
        const ACTIVATION_EXIT_DELAY: u64 = 4;
        epoch + 1 + ACTIVATION_EXIT_DELAY
    }

    /// Per-epoch bound on activations/exits for `active_validator_count`.
    pub fn churn_limit(&self, active_validator_count: usize) -> u64 {
        std::cmp::max(
            self.min_per_epoch_churn_limit,
            active_validator_count as u64 / self.churn_limit_quotient,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Slot;

    #[test]
    fn churn_limit_floor() {
        let spec = ChainSpec::mainnet();
        assert_eq!(spec.churn_limit(0), 4);
        assert_eq!(spec.churn_limit(1000), 4);
        assert_eq!(spec.churn_limit(655_360), 10);
    }

    #[test]
    fn voting_period_start() {
        let spec = ChainSpec::minimal();
        // 4 epochs * 8 slots = 32-slot periods.
        assert_eq!(spec.eth1_voting_period_start_slot(Slot::new(0)), Slot::new(0));
        assert_eq!(spec.eth1_voting_period_start_slot(Slot::new(31)), Slot::new(0));
        assert_eq!(spec.eth1_voting_period_start_slot(Slot::new(32)), Slot::new(32));
        assert_eq!(spec.eth1_voting_period_start_slot(Slot::new(45)), Slot::new(32));
    }
}
