//! Persists per-epoch derivation inputs when finality advances.
//!
//! Once an epoch is finalized its randao mixes will eventually rotate out of
//! the live vectors, so the seeds, registry, balances and participation are
//! written down at finalization time. Historical queries replay duty
//! computation from these records instead of holding old states alive.

use crate::cancel::CancelToken;
use crate::{BeaconChainError, ChainEvent, HeadFetcher, Notifier};
use std::sync::Arc;
use store::{ArchiveWriter, ArchivedCommitteeInfo};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use types::{
    ActiveSetChanges, BeaconStateSnapshot, ChainSpec, Epoch, SeedDomain, ValidatorParticipation,
};

pub struct Archiver {
    head: Arc<dyn HeadFetcher>,
    writer: Arc<dyn ArchiveWriter>,
    notifier: Notifier,
    spec: Arc<ChainSpec>,
}

impl Archiver {
    pub fn new(
        head: Arc<dyn HeadFetcher>,
        writer: Arc<dyn ArchiveWriter>,
        notifier: Notifier,
        spec: Arc<ChainSpec>,
    ) -> Self {
        Self {
            head,
            writer,
            notifier,
            spec,
        }
    }

    /// Writes `epoch`'s records out of `state`.
    ///
    /// The state must still hold `epoch`'s randao mixes; archiving at the
    /// finalization boundary guarantees that.
    pub fn archive_epoch(
        &self,
        state: &BeaconStateSnapshot,
        epoch: Epoch,
    ) -> Result<(), BeaconChainError> {
        let spec = &self.spec;
        let active = state.active_validator_indices(epoch);

        let info = ArchivedCommitteeInfo {
            proposer_seed: state.get_seed(epoch, SeedDomain::Proposer, spec)?,
            attester_seed: state.get_seed(epoch, SeedDomain::Attester, spec)?,
            committee_count: BeaconStateSnapshot::committee_count_per_slot(active.len(), spec),
            start_shard: 0,
            proposer_index: state
                .get_beacon_proposer_index(epoch.start_slot(spec.slots_per_epoch), spec)?,
        };
        self.writer.put_archived_committee_info(epoch, info);
        self.writer
            .put_archived_validators(epoch, state.validators.clone());
        self.writer
            .put_archived_balances(epoch, state.balances.clone());

        if let Some(participation) = participation_of(state, epoch, spec) {
            self.writer.put_archived_participation(epoch, participation);
        }
        self.writer
            .put_archived_active_set_changes(epoch, active_set_changes_of(state, epoch));

        debug!(%epoch, validators = state.validators.len(), "Archived epoch");
        Ok(())
    }

    /// Archives each newly finalized epoch as finality events arrive; runs
    /// until the notifier closes or the token fires.
    pub async fn run(self, cancel: CancelToken) {
        let mut events = self.notifier.subscribe();
        let mut cancel = cancel;
        let mut last_archived: Option<Epoch> = None;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(ChainEvent::FinalizedCheckpoint(checkpoint)) => {
                        if last_archived.is_some_and(|last| last >= checkpoint.epoch) {
                            continue;
                        }
                        let Ok(state) = self.head.head_state() else {
                            continue;
                        };
                        match self.archive_epoch(&state, checkpoint.epoch) {
                            Ok(()) => last_archived = Some(checkpoint.epoch),
                            Err(e) => {
                                warn!(epoch = %checkpoint.epoch, error = ?e, "Failed to archive epoch");
                            }
                        }
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                _ = cancel.canceled() => return,
            }
        }
    }
}

/// Balance-weighted participation of `epoch`, when the state still tracks
/// its flags (the current and previous epochs only).
fn participation_of(
    state: &BeaconStateSnapshot,
    epoch: Epoch,
    spec: &ChainSpec,
) -> Option<ValidatorParticipation> {
    let flags = if epoch == state.current_epoch(spec) {
        &state.current_epoch_participation
    } else if epoch == state.previous_epoch(spec) {
        &state.previous_epoch_participation
    } else {
        return None;
    };

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
    Some(ValidatorParticipation {
        global_participation_rate: if eligible == 0 {
            0.0
        } else {
            voted as f32 / eligible as f32
        },
        voted_ether: voted,
        eligible_ether: eligible,
        finalized: true,
    })
}

fn active_set_changes_of(state: &BeaconStateSnapshot, epoch: Epoch) -> ActiveSetChanges {
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
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CanonicalHead, cancel_pair};
    use store::{Archive, MemoryStore};
    use types::test_utils::TestingStateBuilder;
    use types::{
        BeaconBlock, ChainSpec, Checkpoint, FixedBytesExtended, Hash256, SignatureBytes,
        SignedBeaconBlock, Slot,
    };

    fn head_with_state(
        state: BeaconStateSnapshot,
        notifier: &Notifier,
        spec: &ChainSpec,
    ) -> Arc<CanonicalHead> {
        let head = Arc::new(CanonicalHead::new(notifier.clone(), spec));
        let block = SignedBeaconBlock::from_block(
            BeaconBlock::empty(state.slot),
            SignatureBytes::empty(),
        );
        head.update(
            Hash256::from_low_u64_be(1),
            Arc::new(block),
            Arc::new(state),
        );
        head
    }

    #[test]
    fn archive_epoch_round_trips_through_the_store() {
        let spec = Arc::new(ChainSpec::minimal());
        let notifier = Notifier::default();
        let state = TestingStateBuilder::new(32, &spec)
            .at_slot(Slot::new(24))
            .build();
        let head = head_with_state(state.clone(), &notifier, &spec);
        let store = Arc::new(MemoryStore::new());

        let archiver = Archiver::new(head, store.clone(), notifier, spec.clone());
        let epoch = Epoch::new(2);
        archiver.archive_epoch(&state, epoch).unwrap();

        let info = store.archived_committee_info(epoch).unwrap().unwrap();
        assert_eq!(
            info.attester_seed,
            state
                .get_seed(epoch, SeedDomain::Attester, &spec)
                .unwrap()
        );
        assert_eq!(
            store.archived_validators(epoch).unwrap().unwrap().len(),
            32
        );
        assert_eq!(
            store.archived_balances(epoch).unwrap().unwrap(),
            state.balances
        );
        // Epoch 2 is the previous epoch of a state at slot 24, so the flags
        // were still available.
        let participation = store.archived_participation(epoch).unwrap().unwrap();
        assert_eq!(participation.global_participation_rate, 1.0);
        assert!(store.archived_active_set_changes(epoch).unwrap().is_some());
    }

    #[tokio::test]
    async fn run_archives_on_finality_events() {
        let spec = Arc::new(ChainSpec::minimal());
        let notifier = Notifier::default();
        let state = TestingStateBuilder::new(16, &spec)
            .at_slot(Slot::new(40))
            .build();
        let head = head_with_state(state, &notifier, &spec);
        let store = Arc::new(MemoryStore::new());

        let archiver = Archiver::new(head, store.clone(), notifier.clone(), spec);
        let (handle, token) = cancel_pair();
        let task = tokio::spawn(archiver.run(token));
        tokio::task::yield_now().await;

        notifier.publish(ChainEvent::FinalizedCheckpoint(Checkpoint {
            epoch: Epoch::new(3),
            root: Hash256::from_low_u64_be(3),
        }));
        tokio::task::yield_now().await;

        assert!(
            store
                .archived_committee_info(Epoch::new(3))
                .unwrap()
                .is_some()
        );

        handle.cancel();
        task.await.unwrap();
    }
}
