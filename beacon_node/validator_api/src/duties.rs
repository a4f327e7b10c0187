//! Per-validator duty resolution.
//!
//! The boundary epoch is served live: the archive is consulted only for
//! epochs strictly below the finalized checkpoint. An archive miss for a
//! post-finality epoch falls back to live computation (the archive is an
//! optimization, not a gate); a miss below finality is `NOT_FOUND`.

use crate::{RpcError, ValidatorApi, ValidatorId};
use beacon_chain::{CancelToken, FinalizationFetcher, HeadFetcher};
use rayon::prelude::*;
use store::Archive;
use serde::{Deserialize, Serialize};
use slot_clock::SlotClock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use types::{
    ChainSpec, CommitteeAssignment, CommitteeCache, Epoch, PublicKeyBytes, Slot, Validator,
    ValidatorIndex, compute_proposer_index, slot_proposer_seed,
};

/// Sync-committee membership for one requested validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCommitteeDuty {
    pub validator_index: ValidatorIndex,
    pub public_key: PublicKeyBytes,
    pub in_current_sync_committee: bool,
}

impl<C: SlotClock> ValidatorApi<C> {
    /// Duties for `epoch` for each identified validator. Validators inactive
    /// at `epoch` (or unknown indices) are omitted; an unknown *public key*
    /// is `NOT_FOUND`, since the caller named it explicitly.
    pub fn get_duties(
        &self,
        epoch: Epoch,
        validator_ids: &[ValidatorId],
        cancel: &CancelToken,
    ) -> Result<Vec<CommitteeAssignment>, RpcError> {
        let state = self.head.head_state()?;
        self.reject_future_epoch(epoch, &state)?;

        let finalized = self.finalization.finalized_checkpoint()?.epoch;
        if epoch < finalized {
            match self.archived_duty_inputs(epoch)? {
                Some((cache, validators, proposer_seed)) => {
                    debug!(%epoch, "Resolving duties from the archive");
                    return self.resolve_duties(
                        epoch,
                        validator_ids,
                        &cache,
                        &validators,
                        proposer_seed,
                        cancel,
                    );
                }
                None => {
                    return Err(RpcError::not_found(format!(
                        "epoch {epoch} is finalized but not archived"
                    )));
                }
            }
        }

        let cache = self.live_committee_cache(&state, epoch)?;
        let proposer_seed = state.get_seed(epoch, types::SeedDomain::Proposer, &self.spec)?;
        self.resolve_duties(
            epoch,
            validator_ids,
            &cache,
            &state.validators,
            proposer_seed,
            cancel,
        )
    }

    /// Committee cache, registry and proposer seed for an archived epoch, or
    /// `None` when the archive has no record.
    fn archived_duty_inputs(
        &self,
        epoch: Epoch,
    ) -> Result<Option<(Arc<CommitteeCache>, Vec<Validator>, types::Hash256)>, RpcError> {
        let Some(info) = self.archive.archived_committee_info(epoch)? else {
            return Ok(None);
        };
        let Some(validators) = self.archive.archived_validators(epoch)? else {
            return Ok(None);
        };
        let cache = self.archived_committee_cache(epoch, &info, &validators)?;
        Ok(Some((cache, validators, info.proposer_seed)))
    }

    fn resolve_duties(
        &self,
        epoch: Epoch,
        validator_ids: &[ValidatorId],
        cache: &CommitteeCache,
        validators: &[Validator],
        proposer_seed: types::Hash256,
        cancel: &CancelToken,
    ) -> Result<Vec<CommitteeAssignment>, RpcError> {
        let proposers = proposer_map(epoch, validators, cache, &proposer_seed, &self.spec)?;

        let mut assignments = Vec::with_capacity(validator_ids.len());
        for id in validator_ids {
            if cancel.is_canceled() {
                return Err(RpcError::canceled());
            }
            let index = match self.resolve_id(id, validators)? {
                Some(index) => index,
                None => continue,
            };
            let Some(duty) = cache.get_attestation_duties(index) else {
                // Known validator, inactive this epoch.
                continue;
            };
            let committee = cache
                .get_beacon_committee(duty.slot, duty.index)?
                .to_vec();
            assignments.push(CommitteeAssignment {
                committee,
                committee_index: duty.index,
                attester_slot: duty.slot,
                proposer_slots: proposers.get(&index).cloned().unwrap_or_default(),
                public_key: validators[index as usize].pubkey,
            });
        }
        Ok(assignments)
    }

    /// Maps an id to a registry index. Unknown index: `None` (omitted).
    /// Unknown public key: `NOT_FOUND`.
    fn resolve_id(
        &self,
        id: &ValidatorId,
        validators: &[Validator],
    ) -> Result<Option<ValidatorIndex>, RpcError> {
        match id {
            ValidatorId::Index(index) => {
                Ok((*index < validators.len() as u64).then_some(*index))
            }
            ValidatorId::PublicKey(pubkey) => validators
                .iter()
                .position(|v| &v.pubkey == pubkey)
                .map(|i| Some(i as u64))
                .ok_or_else(|| {
                    RpcError::not_found(format!("unknown validator public key {pubkey}"))
                }),
        }
    }

    /// Paginated duties over the whole registry (or an explicit id subset),
    /// ordered by validator index. The pagination window bounds the duty
    /// computation itself: only the page's validators are resolved.
    pub fn list_assignments(
        &self,
        epoch: Epoch,
        validator_ids: &[ValidatorId],
        page: &crate::pagination::PageRequest,
        cancel: &CancelToken,
    ) -> Result<crate::pagination::Paginated<CommitteeAssignment>, RpcError> {
        let state = self.head.head_state()?;
        self.reject_future_epoch(epoch, &state)?;

        let subject_ids: Vec<ValidatorId> = if validator_ids.is_empty() {
            (0..state.validators.len() as u64)
                .map(ValidatorId::Index)
                .collect()
        } else {
            validator_ids.to_vec()
        };

        let window = crate::pagination::paginate(&subject_ids, page, &self.spec)?;
        let assignments = self.get_duties(epoch, &window.items, cancel)?;
        Ok(crate::pagination::Paginated {
            items: assignments,
            total_size: window.total_size,
            next_page_token: window.next_page_token,
        })
    }

    /// Membership of the requested validators in the head state's current
    /// sync committee.
    pub fn get_sync_committee_duties(
        &self,
        validator_ids: &[ValidatorId],
    ) -> Result<Vec<SyncCommitteeDuty>, RpcError> {
        let state = self.head.head_state()?;
        let mut duties = Vec::with_capacity(validator_ids.len());
        for id in validator_ids {
            let Some(index) = self.resolve_id(id, &state.validators)? else {
                continue;
            };
            duties.push(SyncCommitteeDuty {
                validator_index: index,
                public_key: state.validators[index as usize].pubkey,
                in_current_sync_committee: state.current_sync_committee.contains(&index),
            });
        }
        Ok(duties)
    }
}

/// Proposer index for every slot of `epoch`, inverted into a per-validator
/// slot list. Slots are independent, so the draws run in parallel.
fn proposer_map(
    epoch: Epoch,
    validators: &[Validator],
    cache: &CommitteeCache,
    epoch_proposer_seed: &types::Hash256,
    spec: &ChainSpec,
) -> Result<HashMap<ValidatorIndex, Vec<Slot>>, RpcError> {
    let active_indices: Vec<ValidatorIndex> = validators
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_active_at(epoch))
        .map(|(i, _)| i as u64)
        .collect();
    debug_assert_eq!(active_indices.len(), cache.active_validator_count());

    let slots: Vec<Slot> = epoch.slot_iter(spec.slots_per_epoch).collect();
    let proposers = slots
        .par_iter()
        .map(|slot| {
            let seed = slot_proposer_seed(epoch_proposer_seed, *slot);
            compute_proposer_index(validators, &active_indices, &seed, spec)
                .map(|proposer| (proposer, *slot))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut map: HashMap<ValidatorIndex, Vec<Slot>> = HashMap::new();
    for (proposer, slot) in proposers {
        map.entry(proposer).or_default().push(slot);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::ChainSpec;

    fn ids(range: std::ops::Range<u64>) -> Vec<ValidatorId> {
        range.map(ValidatorId::Index).collect()
    }

    #[test]
    fn every_active_validator_gets_exactly_one_attester_slot() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(100, &spec);
        let epoch = harness.current_epoch();

        let duties = harness
            .api
            .get_duties(epoch, &ids(0..100), &CancelToken::never())
            .unwrap();
        assert_eq!(duties.len(), 100);

        for (validator, duty) in duties.iter().enumerate() {
            assert_eq!(duty.attester_slot.epoch(spec.slots_per_epoch), epoch);
            let occurrences = duty
                .committee
                .iter()
                .filter(|member| **member == validator as u64)
                .count();
            assert_eq!(occurrences, 1, "validator {validator} once in committee");
        }
    }

    #[test]
    fn every_slot_of_the_epoch_has_a_proposer() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(64, &spec);
        let epoch = harness.current_epoch();

        let duties = harness
            .api
            .get_duties(epoch, &ids(0..64), &CancelToken::never())
            .unwrap();

        let mut proposed_slots: Vec<Slot> = duties
            .iter()
            .flat_map(|duty| duty.proposer_slots.clone())
            .collect();
        proposed_slots.sort();
        let expected: Vec<Slot> = epoch.slot_iter(spec.slots_per_epoch).collect();
        assert_eq!(proposed_slots, expected);
    }

    #[test]
    fn proposer_maps_identical_across_calls() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(32, &spec);
        let epoch = harness.current_epoch();

        let first = harness
            .api
            .get_duties(epoch, &ids(0..32), &CancelToken::never())
            .unwrap();
        let second = harness
            .api
            .get_duties(epoch, &ids(0..32), &CancelToken::never())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn future_epoch_is_rejected() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(16, &spec);
        let future = harness.current_epoch() + 1;

        let err = harness
            .api
            .get_duties(future, &ids(0..1), &CancelToken::never())
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_pubkey_is_not_found() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(16, &spec);
        let unknown = types::test_utils::deterministic_pubkey(9999);

        let err = harness
            .api
            .get_duties(
                harness.current_epoch(),
                &[ValidatorId::PublicKey(unknown)],
                &CancelToken::never(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::NotFound);
    }

    #[test]
    fn unknown_index_is_omitted() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(16, &spec);

        let duties = harness
            .api
            .get_duties(
                harness.current_epoch(),
                &[ValidatorId::Index(0), ValidatorId::Index(9999)],
                &CancelToken::never(),
            )
            .unwrap();
        assert_eq!(duties.len(), 1);
    }

    #[test]
    fn canceled_request_stops_early() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(16, &spec);
        let (handle, token) = beacon_chain::cancel_pair();
        handle.cancel();

        let err = harness
            .api
            .get_duties(harness.current_epoch(), &ids(0..16), &token)
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::Canceled);
    }

    #[test]
    fn archived_epoch_served_from_archive() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::with_finality(100, 10, &spec);
        let archived_epoch = Epoch::new(5);
        harness.archive_epoch_from_history(archived_epoch);

        let duties = harness
            .api
            .get_duties(archived_epoch, &ids(0..100), &CancelToken::never())
            .unwrap();
        assert_eq!(duties.len(), 100);

        // Archive fidelity: equal to a live computation over the same seeds.
        let expected = harness.live_duties_for(archived_epoch, 100);
        assert_eq!(duties, expected);
    }

    #[test]
    fn missing_archive_below_finality_is_not_found() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::with_finality(32, 10, &spec);

        let err = harness
            .api
            .get_duties(Epoch::new(3), &ids(0..4), &CancelToken::never())
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::NotFound);
    }

    #[test]
    fn boundary_epoch_is_served_live() {
        // epoch == finalized must not touch the archive.
        let spec = ChainSpec::minimal();
        let harness = TestHarness::with_finality(32, 10, &spec);

        let duties = harness
            .api
            .get_duties(Epoch::new(10), &ids(0..32), &CancelToken::never())
            .unwrap();
        assert_eq!(duties.len(), 32, "live path needs no archive record");
    }

    #[test]
    fn assignments_listing_pages_over_the_registry() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(20, &spec);
        let epoch = harness.current_epoch();

        let first = harness
            .api
            .list_assignments(
                epoch,
                &[],
                &crate::pagination::PageRequest::new(8, ""),
                &CancelToken::never(),
            )
            .unwrap();
        assert_eq!(first.total_size, 20);
        assert_eq!(first.items.len(), 8);
        assert_eq!(first.next_page_token, "1");

        let last = harness
            .api
            .list_assignments(
                epoch,
                &[],
                &crate::pagination::PageRequest::new(8, "2"),
                &CancelToken::never(),
            )
            .unwrap();
        assert_eq!(last.items.len(), 4);
    }

    #[test]
    fn sync_committee_membership() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(16, &spec);

        let duties = harness
            .api
            .get_sync_committee_duties(&ids(0..2))
            .unwrap();
        assert_eq!(duties.len(), 2);
        // The testing state builder cycles all validators into the committee.
        assert!(duties.iter().all(|d| d.in_current_sync_committee));
    }
}
