use crate::{RpcError, ValidatorApi};
use beacon_chain::{FinalizationFetcher, HeadFetcher};
use store::Archive;
use slot_clock::SlotClock;
use types::{ActiveSetChanges, Epoch, ValidatorParticipation};

impl<C: SlotClock> ValidatorApi<C> {
    /// Balance-weighted attestation participation for `epoch`.
    ///
    /// The head snapshot tracks participation flags for the current and
    /// previous epochs; anything older must come from the archive.
    pub fn get_participation(&self, epoch: Epoch) -> Result<ValidatorParticipation, RpcError> {
        let state = self.head.head_state()?;
        self.reject_future_epoch(epoch, &state)?;

        let spec = &self.spec;
        let finalized = self.finalization.finalized_checkpoint()?.epoch;
        let current = state.current_epoch(spec);

        let flags = if epoch == current {
            Some(&state.current_epoch_participation)
        } else if epoch == state.previous_epoch(spec) {
            Some(&state.previous_epoch_participation)
        } else {
            None
        };

        if let Some(flags) = flags {
            let mut voted = 0u64;
            let mut eligible = 0u64;
            for (index, validator) in state.validators.iter().enumerate() {
                if !validator.is_active_at(epoch) {
                    continue;
                }
                eligible += validator.effective_balance;
                if flags.get(index).copied().unwrap_or(false) {
                    voted += validator.effective_balance;
                }
            }
            return Ok(ValidatorParticipation {
                global_participation_rate: if eligible == 0 {
                    0.0
                } else {
                    voted as f32 / eligible as f32
                },
                voted_ether: voted,
                eligible_ether: eligible,
                finalized: epoch <= finalized,
            });
        }

        match self.archive.archived_participation(epoch)? {
            Some(participation) => Ok(participation),
            None => Err(RpcError::not_found(format!(
                "participation of epoch {epoch} is not archived"
            ))),
        }
    }

    /// Validators entering and leaving the active set at `epoch`.
    pub fn get_active_set_changes(&self, epoch: Epoch) -> Result<ActiveSetChanges, RpcError> {
        let state = self.head.head_state()?;
        self.reject_future_epoch(epoch, &state)?;

        let finalized = self.finalization.finalized_checkpoint()?.epoch;
        if epoch < finalized {
            return match self.archive.archived_active_set_changes(epoch)? {
                Some(changes) => Ok(changes),
                None => Err(RpcError::not_found(format!(
                    "active-set changes of epoch {epoch} are not archived"
                ))),
            };
        }

        // Live: read the transitions straight off the registry.
        let mut changes = ActiveSetChanges::default();
        for (index, validator) in state.validators.iter().enumerate() {
            let index = index as u64;
            if validator.activation_epoch == epoch {
                changes.activated.push(index);
            }
            if validator.exit_epoch == epoch {
                changes.exited.push(index);
                if validator.slashed {
                    changes.slashed.push(index);
                }
            }
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::ChainSpec;

    #[test]
    fn full_participation_rate_is_one() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(10, &spec);
        let participation = harness
            .api
            .get_participation(harness.current_epoch())
            .unwrap();
        assert_eq!(participation.global_participation_rate, 1.0);
        assert_eq!(
            participation.eligible_ether,
            10 * spec.max_effective_balance
        );
        assert!(!participation.finalized);
    }

    #[test]
    fn partial_participation_weights_by_balance() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::build_with(4, &spec, |builder| {
            let flags = vec![true, true, false, false];
            builder.state_mut().current_epoch_participation = flags;
        });
        let participation = harness
            .api
            .get_participation(harness.current_epoch())
            .unwrap();
        assert_eq!(participation.global_participation_rate, 0.5);
        assert_eq!(participation.voted_ether, 2 * spec.max_effective_balance);
    }

    #[test]
    fn old_epoch_requires_the_archive() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::at_epoch(8, 10, &spec);

        let err = harness.api.get_participation(Epoch::new(2)).unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::NotFound);

        let archived = ValidatorParticipation {
            global_participation_rate: 0.75,
            voted_ether: 3,
            eligible_ether: 4,
            finalized: true,
        };
        harness
            .store
            .put_archived_participation(Epoch::new(2), archived);
        assert_eq!(
            harness.api.get_participation(Epoch::new(2)).unwrap(),
            archived
        );
    }

    #[test]
    fn live_active_set_changes_from_the_registry() {
        let spec = ChainSpec::minimal();
        let epoch = Epoch::new(4);
        let harness = TestHarness::build_with(10, &spec, |builder| {
            builder.state_mut().slot = epoch.start_slot(spec.slots_per_epoch);
            builder.state_mut().validators[2].activation_epoch = epoch;
            let exited = &mut builder.state_mut().validators[7];
            exited.exit_epoch = epoch;
            exited.slashed = true;
        });

        let changes = harness.api.get_active_set_changes(epoch).unwrap();
        assert_eq!(changes.activated, vec![2]);
        assert_eq!(changes.exited, vec![7]);
        assert_eq!(changes.slashed, vec![7]);
    }
}
