use crate::pagination::{PageRequest, Paginated, paginate};
use crate::{RpcError, ValidatorApi};
use operation_pool::AttestationFilter;
use slot_clock::SlotClock;
use types::Attestation;

impl<C: SlotClock> ValidatorApi<C> {
    /// Pool attestations under `filter`, sorted by
    /// `(data.slot, data.committee_index)`, paginated.
    ///
    /// The pool is a live structure: pages are cut from a fresh sorted view,
    /// so a submission landing between two page requests may shift
    /// boundaries. Within one call the happens-before rule holds: anything
    /// inserted before the call began is visible.
    pub fn list_pool_attestations(
        &self,
        filter: &AttestationFilter,
        page: &PageRequest,
    ) -> Result<Paginated<Attestation>, RpcError> {
        let attestations = self.pool.attestations(filter);
        paginate(&attestations, page, &self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::{AttestationData, ChainSpec, Checkpoint, Epoch, Slot};

    fn attestation(slot: u64, index: u64) -> Attestation {
        let data = AttestationData {
            slot: Slot::new(slot),
            index,
            target: Checkpoint {
                epoch: Slot::new(slot).epoch(8),
                ..Checkpoint::default()
            },
            ..AttestationData::default()
        };
        let mut att = Attestation::empty_for_signing(data, 8).unwrap();
        att.aggregation_bits.set((slot % 8) as usize, true).unwrap();
        att
    }

    #[test]
    fn sorted_and_filtered() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(8, &spec);
        for (slot, index) in [(9, 1), (8, 1), (8, 0), (17, 0)] {
            harness
                .pool
                .insert_unaggregated_attestation(attestation(slot, index))
                .unwrap();
        }

        let all = harness
            .api
            .list_pool_attestations(&AttestationFilter::default(), &PageRequest::default())
            .unwrap();
        let keys: Vec<_> = all
            .items
            .iter()
            .map(|a| (a.data.slot.as_u64(), a.data.index))
            .collect();
        assert_eq!(keys, vec![(8, 0), (8, 1), (9, 1), (17, 0)]);

        let filtered = harness
            .api
            .list_pool_attestations(
                &AttestationFilter {
                    target_epoch: Some(Epoch::new(1)),
                    ..AttestationFilter::default()
                },
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(filtered.total_size, 3);
    }

    #[test]
    fn pagination_round_trip_over_the_pool() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(8, &spec);
        for slot in 0..10 {
            harness
                .pool
                .insert_unaggregated_attestation(attestation(slot, 0))
                .unwrap();
        }

        let mut collected = vec![];
        let mut token = String::new();
        loop {
            let page = harness
                .api
                .list_pool_attestations(
                    &AttestationFilter::default(),
                    &PageRequest::new(4, &token),
                )
                .unwrap();
            let full = page.items.len() == 4;
            collected.extend(page.items);
            if collected.len() >= page.total_size || !full {
                break;
            }
            token = page.next_page_token;
        }
        assert_eq!(collected.len(), 10);
    }
}
