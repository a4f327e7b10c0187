//! A fully wired API instance over in-memory collaborators.

use crate::{Dependencies, ValidatorApi};
use beacon_chain::test_utils::{RecordingBroadcaster, RecordingChainService};
use beacon_chain::{CanonicalHead, FinalizationFetcher, HeadFetcher, Notifier};
use eth1::CachingEth1Backend;
use operation_pool::OperationPool;
use slot_clock::{ManualSlotClock, SlotClock};
use std::sync::Arc;
use std::time::Duration;
use store::MemoryStore;
use types::test_utils::TestingStateBuilder;
use types::{
    BeaconBlock, BeaconStateSnapshot, ChainSpec, Checkpoint, CommitteeAssignment, Epoch,
    FixedBytesExtended, Hash256, SignatureBytes, SignedBeaconBlock, Slot,
};

pub struct TestHarness {
    pub api: Arc<ValidatorApi<ManualSlotClock>>,
    pub canonical_head: Arc<CanonicalHead>,
    pub store: Arc<MemoryStore>,
    pub eth1: Arc<CachingEth1Backend>,
    pub pool: Arc<OperationPool>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub chain: Arc<RecordingChainService>,
    pub notifier: Notifier,
    pub spec: Arc<ChainSpec>,
    /// Clone of the api's clock; manual clocks share their timeline.
    pub slot_clock: ManualSlotClock,
}

impl TestHarness {
    /// A harness whose chain has not started: no head is set.
    pub fn unstarted(spec: &ChainSpec) -> Self {
        let spec = Arc::new(spec.clone());
        let notifier = Notifier::default();
        let canonical_head = Arc::new(CanonicalHead::new(notifier.clone(), &spec));
        let store = Arc::new(MemoryStore::new());
        let eth1 = Arc::new(CachingEth1Backend::new(spec.deposit_contract_tree_depth));
        let pool = Arc::new(OperationPool::new());
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let chain = Arc::new(RecordingChainService::new());
        let slot_clock = ManualSlotClock::new(
            Slot::new(0),
            Duration::from_secs(0),
            Duration::from_secs(spec.seconds_per_slot),
        );

        let api = ValidatorApi::new(Dependencies {
            spec: spec.clone(),
            head: canonical_head.clone(),
            finalization: canonical_head.clone(),
            archive: store.clone(),
            block_store: store.clone(),
            eth1: eth1.clone(),
            deposits: eth1.clone(),
            pool: pool.clone(),
            broadcaster: broadcaster.clone(),
            chain_service: chain.clone(),
            notifier: notifier.clone(),
            slot_clock: slot_clock.clone(),
        });

        Self {
            api,
            canonical_head,
            store,
            eth1,
            pool,
            broadcaster,
            chain,
            notifier,
            spec,
            slot_clock,
        }
    }

    /// `validator_count` genesis-active validators, head at slot 0.
    pub fn new(validator_count: usize, spec: &ChainSpec) -> Self {
        Self::build_with(validator_count, spec, |_| {})
    }

    /// Head at the first slot of `epoch`.
    pub fn at_epoch(validator_count: usize, epoch: u64, spec: &ChainSpec) -> Self {
        let slots_per_epoch = spec.slots_per_epoch;
        Self::build_with(validator_count, spec, move |builder| {
            builder.state_mut().slot = Epoch::new(epoch).start_slot(slots_per_epoch);
        })
    }

    /// Head one epoch past `finalized_epoch`, with finality set accordingly.
    pub fn with_finality(
        validator_count: usize,
        finalized_epoch: u64,
        spec: &ChainSpec,
    ) -> Self {
        let slots_per_epoch = spec.slots_per_epoch;
        Self::build_with(validator_count, spec, move |builder| {
            let state = builder.state_mut();
            state.slot = Epoch::new(finalized_epoch + 1).start_slot(slots_per_epoch);
            state.finalized_checkpoint = Checkpoint {
                epoch: Epoch::new(finalized_epoch),
                root: Hash256::from_low_u64_be(finalized_epoch),
            };
        })
    }

    /// Full control over the state fixture before the head is installed.
    pub fn build_with(
        validator_count: usize,
        spec: &ChainSpec,
        customize: impl FnOnce(&mut TestingStateBuilder),
    ) -> Self {
        let harness = Self::unstarted(spec);
        let mut builder = TestingStateBuilder::new(validator_count, spec);
        customize(&mut builder);
        harness.set_head(builder.build());
        harness
    }

    /// Installs `state` as the canonical head under an empty block, advancing
    /// the clock to match.
    pub fn set_head(&self, state: BeaconStateSnapshot) {
        let block = SignedBeaconBlock::from_block(
            BeaconBlock::empty(state.slot),
            SignatureBytes::empty(),
        );
        let root = block.canonical_root();
        self.slot_clock.set_slot(state.slot.as_u64());
        self.canonical_head
            .update(root, Arc::new(block), Arc::new(state));
    }

    pub fn current_epoch(&self) -> Epoch {
        self.head_state().current_epoch(&self.spec)
    }

    pub fn head_state(&self) -> Arc<types::BeaconStateSnapshot> {
        self.canonical_head
            .head_state()
            .expect("harness head is set")
    }

    pub fn head_slot(&self) -> Slot {
        self.canonical_head.head_slot().expect("harness head is set")
    }

    pub fn head_root(&self) -> Hash256 {
        self.canonical_head.head_root().expect("harness head is set")
    }

    /// Persists `epoch`'s records to the archive, exactly as the
    /// finalization archiver would.
    pub fn archive_epoch_from_history(&self, epoch: Epoch) {
        let archiver = beacon_chain::Archiver::new(
            self.canonical_head.clone(),
            self.store.clone(),
            self.notifier.clone(),
            self.spec.clone(),
        );
        archiver
            .archive_epoch(&self.head_state(), epoch)
            .expect("epoch is archivable from the harness head");
    }

    /// Duties for `0..validator_count` at `epoch` computed against the live
    /// snapshot, ignoring finality routing. The reference result for archive
    /// fidelity checks.
    pub fn live_duties_for(
        &self,
        epoch: Epoch,
        validator_count: u64,
    ) -> Vec<CommitteeAssignment> {
        // A sibling API over the same head, with finality pinned to genesis
        // so every epoch resolves through the live path.
        let live_api = ValidatorApi::new(Dependencies {
            spec: self.spec.clone(),
            head: self.canonical_head.clone(),
            finalization: Arc::new(GenesisFinality),
            archive: self.store.clone(),
            block_store: self.store.clone(),
            eth1: self.eth1.clone(),
            deposits: self.eth1.clone(),
            pool: self.pool.clone(),
            broadcaster: self.broadcaster.clone(),
            chain_service: self.chain.clone(),
            notifier: self.notifier.clone(),
            slot_clock: ManualSlotClock::new(
                Slot::new(0),
                Duration::from_secs(0),
                Duration::from_secs(self.spec.seconds_per_slot),
            ),
        });

        let ids: Vec<crate::ValidatorId> =
            (0..validator_count).map(crate::ValidatorId::Index).collect();
        live_api
            .get_duties(epoch, &ids, &beacon_chain::CancelToken::never())
            .expect("live duties computable")
    }
}

/// Finality pinned at genesis: everything is unfinalized, nothing archival.
struct GenesisFinality;

impl FinalizationFetcher for GenesisFinality {
    fn finalized_checkpoint(&self) -> Result<Checkpoint, beacon_chain::BeaconChainError> {
        Ok(Checkpoint::default())
    }
}
