//! Attestation and block template assembly.

use crate::{RpcError, ValidatorApi};
use beacon_chain::{AttesterCacheError, CancelToken, HeadFetcher};
use eth1::DepositFetcher;
use slot_clock::SlotClock;
use tracing::debug;
use types::typenum::Unsigned;
use types::{
    AttestationData, BeaconBlock, Checkpoint, CommitteeIndex, Hash256, SignatureBytes, Slot,
    VariableList,
};

impl<C: SlotClock> ValidatorApi<C> {
    /// The `AttestationData` an attester of `(slot, committee_index)` signs.
    ///
    /// Served from the template cache: for a given fingerprint, one build per
    /// epoch, byte-identical to every caller.
    pub fn get_attestation_template(
        &self,
        slot: Slot,
        committee_index: CommitteeIndex,
        cancel: &CancelToken,
    ) -> Result<AttestationData, RpcError> {
        let state = self.head.head_state()?;
        let head_root = self.head.head_root()?;
        let spec = &self.spec;

        let current_epoch = state.current_epoch(spec);
        let request_epoch = slot.epoch(spec.slots_per_epoch);
        if request_epoch != current_epoch {
            return Err(RpcError::invalid_argument(format!(
                "slot {slot} is in epoch {request_epoch}, templates exist for the \
                 current epoch {current_epoch} only"
            )));
        }

        let cache = self.live_committee_cache(&state, request_epoch)?;
        if committee_index >= cache.committees_per_slot() {
            return Err(RpcError::invalid_argument(format!(
                "committee index {committee_index} exceeds the {} committees per slot",
                cache.committees_per_slot()
            )));
        }

        let template = self.attester_cache.get_or_build(
            slot,
            committee_index,
            cancel,
            || build_attestation_data(&state, head_root, slot, committee_index, spec),
        )?;
        Ok(template)
    }

    /// Evicts templates of epochs other than the head's current epoch.
    /// Driven by the embedder on epoch transitions.
    pub fn prune_attestation_templates(&self) -> Result<(), RpcError> {
        let state = self.head.head_state()?;
        self.attester_cache
            .prune(state.current_epoch(&self.spec), self.spec.slots_per_epoch);
        Ok(())
    }

    /// Assembles the unsigned block a proposer of `slot` signs.
    ///
    /// The state root is left zero for the state transition to fill; every
    /// operation list is drained from the pool under its block limits.
    pub fn get_block_template(
        &self,
        slot: Slot,
        randao_reveal: SignatureBytes,
        graffiti: Hash256,
        cancel: &CancelToken,
    ) -> Result<BeaconBlock, RpcError> {
        let state = self.head.head_state()?;
        let parent_root = self.head.head_root()?;
        let spec = &self.spec;

        if slot < state.slot {
            return Err(RpcError::invalid_argument(format!(
                "cannot produce a block at slot {slot} behind the head slot {}",
                state.slot
            )));
        }
        if let Some(now) = self.slot_clock.now() {
            if slot > now + 1 {
                return Err(RpcError::invalid_argument(format!(
                    "slot {slot} is ahead of the wall-clock slot {now}"
                )));
            }
        }
        if cancel.is_canceled() {
            return Err(RpcError::canceled());
        }

        let proposer_index = state.get_beacon_proposer_index(slot, spec)?;

        let deadline = std::time::Instant::now() + spec.eth1_data_timeout;
        let eth1_data =
            beacon_chain::eth1_data_for_block_production(&state, self.eth1.as_ref(), spec, deadline);

        // Deposits are proven against the state's current eth1 data; the
        // in-flight vote only moves the root at a period boundary.
        let deposits = self
            .deposits
            .deposits_for_block_inclusion(
                state.eth1_deposit_index,
                &state.eth1_data,
                spec.max_deposits,
            )
            .unwrap_or_else(|e| {
                debug!(error = ?e, "No deposits included in block template");
                vec![]
            });

        if cancel.is_canceled() {
            return Err(RpcError::canceled());
        }

        let attestations = self.pool.attestations_for_block(
            slot,
            spec.min_attestation_inclusion_delay,
            spec.slots_per_epoch,
            types::MaxAttestations::to_usize(),
        );

        let mut block = BeaconBlock::empty(slot);
        block.proposer_index = proposer_index;
        block.parent_root = parent_root;
        block.body.randao_reveal = randao_reveal;
        block.body.graffiti = graffiti;
        block.body.eth1_data = eth1_data;
        block.body.proposer_slashings = into_bounded(
            self.pool
                .proposer_slashings_for_block(types::MaxProposerSlashings::to_usize()),
        );
        block.body.attester_slashings = into_bounded(
            self.pool
                .attester_slashings_for_block(types::MaxAttesterSlashings::to_usize()),
        );
        block.body.attestations = into_bounded(attestations);
        block.body.deposits = into_bounded(deposits);
        block.body.voluntary_exits = into_bounded(
            self.pool
                .voluntary_exits_for_block(types::MaxVoluntaryExits::to_usize()),
        );
        block.body.bls_to_execution_changes = into_bounded(
            self.pool
                .bls_to_execution_changes_for_block(types::MaxBlsToExecutionChanges::to_usize()),
        );

        Ok(block)
    }
}

/// Builds the attestation data the slow way; callers go through the cache.
fn build_attestation_data(
    state: &types::BeaconStateSnapshot,
    head_root: Hash256,
    slot: Slot,
    committee_index: CommitteeIndex,
    spec: &types::ChainSpec,
) -> Result<AttestationData, AttesterCacheError> {
    let current_epoch = state.current_epoch(spec);
    let target_slot = current_epoch.start_slot(spec.slots_per_epoch);
    let target_root = if state.slot <= target_slot {
        head_root
    } else {
        state
            .get_block_root(target_slot)
            .map_err(|e| AttesterCacheError::BuildFailed(format!("{e:?}")))?
    };

    Ok(AttestationData {
        slot,
        index: committee_index,
        beacon_block_root: head_root,
        source: state.current_justified_checkpoint,
        target: Checkpoint {
            epoch: current_epoch,
            root: target_root,
        },
    })
}

fn into_bounded<T, N: types::typenum::Unsigned>(items: Vec<T>) -> VariableList<T, N> {
    debug_assert!(items.len() <= N::to_usize());
    VariableList::new(items).unwrap_or_else(|_| VariableList::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use types::ChainSpec;

    #[test]
    fn template_carries_head_and_justification() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(32, &spec);
        let state = harness.head_state();
        let slot = state.slot;

        let template = harness
            .api
            .get_attestation_template(slot, 0, &CancelToken::never())
            .unwrap();

        assert_eq!(template.slot, slot);
        assert_eq!(template.index, 0);
        assert_eq!(
            template.beacon_block_root,
            harness.head_root()
        );
        assert_eq!(template.source, state.current_justified_checkpoint);
        assert_eq!(
            template.target.epoch,
            state.current_epoch(&spec),
        );
    }

    #[test]
    fn wrong_epoch_slot_is_rejected() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(32, &spec);
        let head_slot = harness.head_slot();

        let err = harness
            .api
            .get_attestation_template(
                head_slot + spec.slots_per_epoch,
                0,
                &CancelToken::never(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn excessive_committee_index_is_rejected() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(32, &spec);
        let slot = harness.head_slot();

        let err = harness
            .api
            .get_attestation_template(slot, 999, &CancelToken::never())
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn repeated_requests_are_byte_identical() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(32, &spec);
        let slot = harness.head_slot();

        let first = harness
            .api
            .get_attestation_template(slot, 1, &CancelToken::never())
            .unwrap();
        let second = harness
            .api
            .get_attestation_template(slot, 1, &CancelToken::never())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn block_template_has_proposer_and_parent() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(64, &spec);
        let state = harness.head_state();
        let slot = state.slot + 1;

        let block = harness
            .api
            .get_block_template(
                slot,
                SignatureBytes::empty(),
                Hash256::ZERO,
                &CancelToken::never(),
            )
            .unwrap();

        assert_eq!(block.slot, slot);
        assert_eq!(block.parent_root, harness.head_root());
        assert_eq!(
            block.proposer_index,
            state.get_beacon_proposer_index(slot, &spec).unwrap()
        );
        assert_eq!(block.state_root, Hash256::ZERO);
    }

    #[test]
    fn block_template_behind_head_is_rejected() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::at_epoch(16, 8, &spec);

        let err = harness
            .api
            .get_block_template(
                Slot::new(3),
                SignatureBytes::empty(),
                Hash256::ZERO,
                &CancelToken::never(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn block_template_far_ahead_of_the_clock_is_rejected() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::new(32, &spec);

        let err = harness
            .api
            .get_block_template(
                harness.head_slot() + 5,
                SignatureBytes::empty(),
                Hash256::ZERO,
                &CancelToken::never(),
            )
            .unwrap_err();
        assert_eq!(err.kind, crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn block_template_includes_eligible_pool_attestations() {
        let spec = ChainSpec::minimal();
        let harness = TestHarness::at_epoch(32, 10, &spec);
        let state = harness.head_state();

        // An attestation from the previous slot is includable at slot 11.
        let template = harness
            .api
            .get_attestation_template(state.slot, 0, &CancelToken::never())
            .unwrap();
        let mut attestation =
            types::Attestation::empty_for_signing(template, 4).unwrap();
        attestation.aggregation_bits.set(0, true).unwrap();
        harness
            .pool
            .insert_unaggregated_attestation(attestation)
            .unwrap();

        let block = harness
            .api
            .get_block_template(
                state.slot + 1,
                SignatureBytes::empty(),
                Hash256::ZERO,
                &CancelToken::never(),
            )
            .unwrap();
        assert_eq!(block.body.attestations.len(), 1);
    }
}
