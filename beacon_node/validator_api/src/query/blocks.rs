use crate::pagination::{PageRequest, Paginated, paginate};
use crate::{RpcError, ValidatorApi};
use slot_clock::SlotClock;
use store::BlockStore;
use types::{Epoch, Hash256, SignedBeaconBlock, Slot};

/// Exactly one selector must be given; blocks have no "list everything".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockFilter {
    Slot(Slot),
    Root(Hash256),
    Epoch(Epoch),
    EpochRange { start: Epoch, end: Epoch },
}

impl<C: SlotClock> ValidatorApi<C> {
    /// Blocks under `filter`, ordered by `(slot, root)`.
    pub fn list_blocks(
        &self,
        filter: &BlockFilter,
        page: &PageRequest,
    ) -> Result<Paginated<(Hash256, SignedBeaconBlock)>, RpcError> {
        let spec = &self.spec;
        let blocks = match filter {
            BlockFilter::Slot(slot) => self.block_store.blocks_by_slot(*slot)?,
            BlockFilter::Root(root) => self
                .block_store
                .get_block(root)?
                .map(|block| vec![(*root, block)])
                .unwrap_or_default(),
            BlockFilter::Epoch(epoch) => self.block_store.blocks_by_slot_range(
                epoch.start_slot(spec.slots_per_epoch),
                epoch.end_slot(spec.slots_per_epoch),
            )?,
            BlockFilter::EpochRange { start, end } => {
                if start > end {
                    return Err(RpcError::invalid_argument(format!(
                        "epoch range start {start} is after end {end}"
                    )));
                }
                self.block_store.blocks_by_slot_range(
                    start.start_slot(spec.slots_per_epoch),
                    end.end_slot(spec.slots_per_epoch),
                )?
            }
        };

        paginate(&blocks, page, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::{BeaconBlock, ChainSpec, FixedBytesExtended, SignatureBytes};

    fn store_block(harness: &TestHarness, root: u64, slot: u64) {
        harness
            .store
            .put_block(
                Hash256::from_low_u64_be(root),
                SignedBeaconBlock::from_block(
                    BeaconBlock::empty(Slot::new(slot)),
                    SignatureBytes::empty(),
                ),
            )
            .unwrap();
    }

    #[test]
    fn filter_by_slot_root_and_epoch() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(8, &spec);
        store_block(&harness, 1, 3);
        store_block(&harness, 2, 3);
        store_block(&harness, 3, 9); // epoch 1
        store_block(&harness, 4, 17); // epoch 2

        let by_slot = harness
            .api
            .list_blocks(&BlockFilter::Slot(Slot::new(3)), &PageRequest::default())
            .unwrap();
        assert_eq!(by_slot.total_size, 2);

        let by_root = harness
            .api
            .list_blocks(
                &BlockFilter::Root(Hash256::from_low_u64_be(3)),
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(by_root.total_size, 1);
        assert_eq!(by_root.items[0].1.slot(), 9);

        let by_epoch = harness
            .api
            .list_blocks(&BlockFilter::Epoch(Epoch::new(0)), &PageRequest::default())
            .unwrap();
        assert_eq!(by_epoch.total_size, 2);

        let by_range = harness
            .api
            .list_blocks(
                &BlockFilter::EpochRange {
                    start: Epoch::new(0),
                    end: Epoch::new(2),
                },
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(by_range.total_size, 4);
    }

    #[test]
    fn inverted_range_is_invalid() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(8, &spec);
        let err = harness
            .api
            .list_blocks(
                &BlockFilter::EpochRange {
                    start: Epoch::new(3),
                    end: Epoch::new(1),
                },
                &PageRequest::default(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_root_is_an_empty_page() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(8, &spec);
        let page = harness
            .api
            .list_blocks(
                &BlockFilter::Root(Hash256::from_low_u64_be(404)),
                &PageRequest::default(),
            )
            .unwrap();
        assert_eq!(page.total_size, 0);
        assert_eq!(page.next_page_token, "");
    }
}
