use crate::{
    BeaconChainError, ChainEvent, FinalizationFetcher, HeadFetcher, Notifier,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use types::{BeaconStateSnapshot, ChainSpec, Checkpoint, Hash256, SignedBeaconBlock, Slot};

struct HeadSnapshot {
    root: Hash256,
    block: Arc<SignedBeaconBlock>,
    state: Arc<BeaconStateSnapshot>,
}

/// The mutable head pointer behind an immutable-snapshot interface.
///
/// Fork choice (a collaborator) decides what the head is; this type only
/// stores the decision and republishes it. Readers get `Arc`s to frozen
/// snapshots, so a head update never invalidates an in-flight request.
pub struct CanonicalHead {
    inner: RwLock<Option<HeadSnapshot>>,
    notifier: Notifier,
    slots_per_epoch: u64,
}

impl CanonicalHead {
    pub fn new(notifier: Notifier, spec: &ChainSpec) -> Self {
        Self {
            inner: RwLock::new(None),
            notifier,
            slots_per_epoch: spec.slots_per_epoch,
        }
    }

    /// Installs a new head and publishes `NewHead`.
    pub fn update(
        &self,
        root: Hash256,
        block: Arc<SignedBeaconBlock>,
        state: Arc<BeaconStateSnapshot>,
    ) {
        let slot = block.slot();
        let finalized = state.finalized_checkpoint;
        let previous_finalized = self
            .inner
            .read()
            .as_ref()
            .map(|head| head.state.finalized_checkpoint);

        *self.inner.write() = Some(HeadSnapshot { root, block, state });

        debug!(%root, %slot, "New canonical head");
        self.notifier.publish(ChainEvent::NewHead {
            root,
            slot,
            epoch: slot.epoch(self.slots_per_epoch),
        });
        if previous_finalized.is_some_and(|previous| previous != finalized) {
            self.notifier.publish(ChainEvent::FinalizedCheckpoint(finalized));
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl HeadFetcher for CanonicalHead {
    fn head_root(&self) -> Result<Hash256, BeaconChainError> {
        self.inner
            .read()
            .as_ref()
            .map(|head| head.root)
            .ok_or(BeaconChainError::ChainNotStarted)
    }

    fn head_slot(&self) -> Result<Slot, BeaconChainError> {
        self.inner
            .read()
            .as_ref()
            .map(|head| head.block.slot())
            .ok_or(BeaconChainError::ChainNotStarted)
    }

    fn head_state(&self) -> Result<Arc<BeaconStateSnapshot>, BeaconChainError> {
        self.inner
            .read()
            .as_ref()
            .map(|head| head.state.clone())
            .ok_or(BeaconChainError::ChainNotStarted)
    }

    fn head_block(&self) -> Result<Arc<SignedBeaconBlock>, BeaconChainError> {
        self.inner
            .read()
            .as_ref()
            .map(|head| head.block.clone())
            .ok_or(BeaconChainError::ChainNotStarted)
    }
}

impl FinalizationFetcher for CanonicalHead {
    fn finalized_checkpoint(&self) -> Result<Checkpoint, BeaconChainError> {
        Ok(self.head_state()?.finalized_checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{
        BeaconBlock, ChainSpec, FixedBytesExtended, SignatureBytes,
        test_utils::TestingStateBuilder,
    };

    fn head_parts(slot: u64, spec: &ChainSpec) -> (Hash256, Arc<SignedBeaconBlock>, Arc<BeaconStateSnapshot>) {
        let state = TestingStateBuilder::new(8, spec).at_slot(Slot::new(slot)).build();
        let block = SignedBeaconBlock::from_block(
            BeaconBlock::empty(Slot::new(slot)),
            SignatureBytes::empty(),
        );
        (Hash256::from_low_u64_be(slot + 1), Arc::new(block), Arc::new(state))
    }

    #[test]
    fn unset_head_is_chain_not_started() {
        let spec = ChainSpec::minimal();
        let head = CanonicalHead::new(Notifier::default(), &spec);
        assert_eq!(head.head_root(), Err(BeaconChainError::ChainNotStarted));
        assert!(!head.is_started());
    }

    #[tokio::test]
    async fn update_publishes_new_head() {
        let spec = ChainSpec::minimal();
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();
        let head = CanonicalHead::new(notifier, &spec);

        let (root, block, state) = head_parts(9, &spec);
        head.update(root, block, state);

        assert_eq!(head.head_root().unwrap(), root);
        assert_eq!(head.head_slot().unwrap(), Slot::new(9));
        match rx.recv().await.unwrap() {
            ChainEvent::NewHead { root: r, slot, epoch } => {
                assert_eq!(r, root);
                assert_eq!(slot, Slot::new(9));
                assert_eq!(epoch, Slot::new(9).epoch(spec.slots_per_epoch));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn snapshots_survive_head_updates() {
        let spec = ChainSpec::minimal();
        let head = CanonicalHead::new(Notifier::default(), &spec);

        let (root_a, block_a, state_a) = head_parts(1, &spec);
        head.update(root_a, block_a, state_a);
        let held = head.head_state().unwrap();

        let (root_b, block_b, state_b) = head_parts(2, &spec);
        head.update(root_b, block_b, state_b);

        // The old snapshot is still intact for the in-flight request.
        assert_eq!(held.slot, Slot::new(1));
        assert_eq!(head.head_state().unwrap().slot, Slot::new(2));
    }
}
