use crate::pagination::{PageRequest, Paginated, paginate};
use crate::{RpcError, ValidatorApi};
use serde::{Deserialize, Serialize};
use beacon_chain::{FinalizationFetcher, HeadFetcher};
use slot_clock::SlotClock;
use store::Archive;
use std::collections::HashSet;
use types::{Epoch, PublicKeyBytes, Validator, ValidatorIndex};

/// Subset selection for validator and balance listings. Empty id sets match
/// the whole registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidatorFilter {
    pub indices: Vec<ValidatorIndex>,
    pub public_keys: Vec<PublicKeyBytes>,
    /// Restrict to validators active at the query epoch.
    pub active_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorEntry {
    pub index: ValidatorIndex,
    pub validator: Validator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub index: ValidatorIndex,
    pub public_key: PublicKeyBytes,
    pub balance: u64,
}

impl<C: SlotClock> ValidatorApi<C> {
    /// The registry at `epoch`, filtered and paginated, ordered by index.
    pub fn list_validators(
        &self,
        epoch: Epoch,
        filter: &ValidatorFilter,
        page: &PageRequest,
    ) -> Result<Paginated<ValidatorEntry>, RpcError> {
        let validators = self.registry_at_epoch(epoch)?;
        let selected: Vec<ValidatorEntry> = select(&validators, filter, epoch)
            .map(|(index, validator)| ValidatorEntry {
                index,
                validator: validator.clone(),
            })
            .collect();
        paginate(&selected, page, &self.spec)
    }

    /// Balances at `epoch`, filtered and paginated, ordered by index.
    pub fn list_balances(
        &self,
        epoch: Epoch,
        filter: &ValidatorFilter,
        page: &PageRequest,
    ) -> Result<Paginated<BalanceEntry>, RpcError> {
        let validators = self.registry_at_epoch(epoch)?;
        let balances = self.balances_at_epoch(epoch)?;
        if balances.len() != validators.len() {
            return Err(RpcError::internal(format!(
                "registry of {} validators with {} balances",
                validators.len(),
                balances.len()
            )));
        }

        let selected: Vec<BalanceEntry> = select(&validators, filter, epoch)
            .map(|(index, validator)| BalanceEntry {
                index,
                public_key: validator.pubkey,
                balance: balances[index as usize],
            })
            .collect();
        paginate(&selected, page, &self.spec)
    }

    /// The registry as of `epoch`: the head snapshot's registry at or above
    /// finality, the archived registry below it.
    fn registry_at_epoch(&self, epoch: Epoch) -> Result<Vec<Validator>, RpcError> {
        let state = self.head.head_state()?;
        self.reject_future_epoch(epoch, &state)?;

        let finalized = self.finalization.finalized_checkpoint()?.epoch;
        if epoch >= finalized {
            return Ok(state.validators.clone());
        }
        match self.archive.archived_validators(epoch)? {
            Some(validators) => Ok(validators),
            None => Err(RpcError::not_found(format!(
                "validators of epoch {epoch} are not archived"
            ))),
        }
    }

    fn balances_at_epoch(&self, epoch: Epoch) -> Result<Vec<u64>, RpcError> {
        let state = self.head.head_state()?;
        let finalized = self.finalization.finalized_checkpoint()?.epoch;
        if epoch >= finalized {
            return Ok(state.balances.clone());
        }
        match self.archive.archived_balances(epoch)? {
            Some(balances) => Ok(balances),
            None => Err(RpcError::not_found(format!(
                "balances of epoch {epoch} are not archived"
            ))),
        }
    }
}

/// Applies the filter, yielding `(index, validator)` in index order.
fn select<'a>(
    validators: &'a [Validator],
    filter: &'a ValidatorFilter,
    epoch: Epoch,
) -> impl Iterator<Item = (ValidatorIndex, &'a Validator)> {
    let explicit_ids = !filter.indices.is_empty() || !filter.public_keys.is_empty();
    let indices: HashSet<ValidatorIndex> = filter.indices.iter().copied().collect();
    let keys: HashSet<PublicKeyBytes> = filter.public_keys.iter().copied().collect();

    validators
        .iter()
        .enumerate()
        .map(|(index, validator)| (index as ValidatorIndex, validator))
        .filter(move |(index, validator)| {
            if explicit_ids && !indices.contains(index) && !keys.contains(&validator.pubkey) {
                return false;
            }
            !filter.active_only || validator.is_active_at(epoch)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::ChainSpec;
    use types::test_utils::deterministic_pubkey;

    #[test]
    fn lists_whole_registry_by_default() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(20, &spec);
        let page = harness
            .api
            .list_validators(
                harness.current_epoch(),
                &ValidatorFilter::default(),
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(page.total_size, 20);
        assert_eq!(page.items[0].index, 0);
        assert_eq!(page.items[19].index, 19);
    }

    #[test]
    fn filters_by_index_and_pubkey() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(20, &spec);
        let filter = ValidatorFilter {
            indices: vec![3],
            public_keys: vec![deterministic_pubkey(11)],
            ..ValidatorFilter::default()
        };
        let page = harness
            .api
            .list_validators(harness.current_epoch(), &filter, &PageRequest::default())
            .unwrap();
        let indices: Vec<_> = page.items.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![3, 11]);
    }

    #[test]
    fn active_only_excludes_pending() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::build_with(10, &spec, |builder| {
            builder.state_mut().validators[4].activation_epoch = Epoch::new(50);
        });
        let filter = ValidatorFilter {
            active_only: true,
            ..ValidatorFilter::default()
        };
        let page = harness
            .api
            .list_validators(harness.current_epoch(), &filter, &PageRequest::default())
            .unwrap();
        assert_eq!(page.total_size, 9);
        assert!(page.items.iter().all(|e| e.index != 4));
    }

    #[test]
    fn balances_align_with_indices() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::build_with(8, &spec, |builder| {
            builder.state_mut().balances[5] = 31_000_000_000;
        });
        let page = harness
            .api
            .list_balances(
                harness.current_epoch(),
                &ValidatorFilter {
                    indices: vec![5],
                    ..ValidatorFilter::default()
                },
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].balance, 31_000_000_000);
        assert_eq!(page.items[0].public_key, deterministic_pubkey(5));
    }

    #[test]
    fn archived_epoch_reads_the_archive() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::with_finality(10, 6, &spec);
        let epoch = Epoch::new(2);
        harness
            .store
            .put_archived_balances(epoch, vec![7_000_000_000; 10]);
        harness.store.put_archived_validators(
            epoch,
            harness.head_state().validators.clone(),
        );

        let page = harness
            .api
            .list_balances(epoch, &ValidatorFilter::default(), &PageRequest::default())
            .unwrap();
        assert_eq!(page.items[0].balance, 7_000_000_000);
    }

    #[test]
    fn unarchived_finalized_epoch_is_not_found() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::with_finality(10, 6, &spec);
        let err = harness
            .api
            .list_validators(
                Epoch::new(2),
                &ValidatorFilter::default(),
                &PageRequest::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::NotFound);
    }

    #[test]
    fn future_epoch_is_rejected() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(10, &spec);
        let err = harness
            .api
            .list_validators(
                harness.current_epoch() + 1,
                &ValidatorFilter::default(),
                &PageRequest::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn pagination_boundaries_hold_for_validators() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(100, &spec);
        let epoch = harness.current_epoch();

        let last = harness
            .api
            .list_validators(
                epoch,
                &ValidatorFilter::default(),
                &PageRequest::new(3, "33"),
            )
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].index, 99);
        assert_eq!(last.next_page_token, "34");

        let err = harness
            .api
            .list_validators(
                epoch,
                &ValidatorFilter::default(),
                &PageRequest::new(100, "1"),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::OutOfRange);
    }
}
