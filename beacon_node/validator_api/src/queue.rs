//! The activation and exit queues.

use crate::{RpcError, ValidatorApi};
use beacon_chain::{FinalizationFetcher, HeadFetcher};
use serde::{Deserialize, Serialize};
use slot_clock::SlotClock;
use types::{Epoch, ValidatorIndex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorQueue {
    /// Validators awaiting activation, by eligibility order, truncated to the
    /// churn limit.
    pub activation: Vec<ValidatorIndex>,
    /// Validators whose exit is scheduled into the pending exit-queue epoch.
    pub exit: Vec<ValidatorIndex>,
    pub churn_limit: u64,
}

impl<C: SlotClock> ValidatorApi<C> {
    pub fn get_validator_queue(&self) -> Result<ValidatorQueue, RpcError> {
        let state = self.head.head_state()?;
        let finalized_epoch = self.finalization.finalized_checkpoint()?.epoch;
        let spec = &self.spec;

        let active_count = state
            .active_validator_indices(state.current_epoch(spec))
            .len();
        let churn_limit = spec.churn_limit(active_count);

        // Activation queue: eligible, not yet activatable at the finalized
        // epoch's activation boundary.
        let activation_boundary = spec.compute_activation_exit_epoch(finalized_epoch);
        let mut activation: Vec<(Epoch, ValidatorIndex)> = state
            .validators
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                v.is_eligible_for_activation_queue(spec)
                    && v.activation_epoch >= activation_boundary
            })
            .map(|(i, v)| (v.activation_eligibility_epoch, i as u64))
            .collect();
        activation.sort();
        let activation: Vec<ValidatorIndex> = activation
            .into_iter()
            .map(|(_, index)| index)
            .take(churn_limit as usize)
            .collect();

        // Exit queue: the epoch at which the next exit lands, bumped by one
        // if that epoch's churn allowance is already spent.
        let exiting: Vec<(Epoch, ValidatorIndex)> = state
            .validators
            .iter()
            .enumerate()
            .filter(|(_, v)| v.has_initiated_exit(spec))
            .map(|(i, v)| (v.exit_epoch, i as u64))
            .collect();

        let mut exit_queue_epoch = exiting
            .iter()
            .map(|(epoch, _)| *epoch)
            .max()
            .unwrap_or_else(|| spec.compute_activation_exit_epoch(finalized_epoch));
        let exits_at_queue_epoch = exiting
            .iter()
            .filter(|(epoch, _)| *epoch == exit_queue_epoch)
            .count() as u64;
        if exits_at_queue_epoch >= churn_limit {
            exit_queue_epoch += 1;
        }

        let withdrawability_boundary =
            exit_queue_epoch + spec.min_validator_withdrawability_delay.as_u64();
        let mut exit: Vec<ValidatorIndex> = exiting
            .into_iter()
            .filter(|(_, index)| {
                state.validators[*index as usize].withdrawable_epoch
                    < withdrawability_boundary
            })
            .map(|(_, index)| index)
            .collect();
        exit.sort();

        Ok(ValidatorQueue {
            activation,
            exit,
            churn_limit,
        })
    }
}
