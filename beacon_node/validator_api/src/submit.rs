//! Validated submission ingress: attestations, aggregates, blocks, exits,
//! slashings, credential changes and sync messages.
//!
//! Every operation is idempotent under signing-root equality: a replay
//! acknowledges `AlreadyKnown` and leaves the pool untouched. Structural
//! validation happens here; cryptographic verification is the verifier
//! collaborators' concern.

use crate::{RpcError, ValidatorApi};
use beacon_chain::{BlockVerdict, Broadcaster, ChainService, HeadFetcher};
use ethereum_hashing::hash_fixed;
use operation_pool::InsertOutcome;
use slot_clock::SlotClock;
use ssz::Encode;
use tracing::{debug, warn};
use tree_hash::TreeHash;
use types::{
    Attestation, AttesterSlashing, ProposerSlashing, SignedAggregateAndProof, SignedBeaconBlock,
    SignedBlsToExecutionChange, SignedVoluntaryExit, SyncCommitteeMessage,
};

/// Gossip topics, named after the messages they carry.
const ATTESTATION_TOPIC: &str = "beacon_attestation";
const AGGREGATE_TOPIC: &str = "beacon_aggregate_and_proof";
const BLOCK_TOPIC: &str = "beacon_block";
const EXIT_TOPIC: &str = "voluntary_exit";
const PROPOSER_SLASHING_TOPIC: &str = "proposer_slashing";
const ATTESTER_SLASHING_TOPIC: &str = "attester_slashing";
const BLS_CHANGE_TOPIC: &str = "bls_to_execution_change";
const SYNC_MESSAGE_TOPIC: &str = "sync_committee_message";

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionAck {
    Accepted,
    /// The same message (by signing root) was submitted before.
    AlreadyKnown,
}

impl<C: SlotClock> ValidatorApi<C> {
    /// Accepts a signed attestation: pool, gossip, fork-choice observation.
    pub fn submit_attestation(&self, attestation: Attestation) -> Result<SubmissionAck, RpcError> {
        if attestation.aggregation_bits.is_zero() {
            return Err(RpcError::invalid_argument(
                "attestation carries no aggregation bits",
            ));
        }
        let signing_root = attestation.data.tree_hash_root();

        match self.pool.insert_unaggregated_attestation(attestation.clone())? {
            InsertOutcome::AlreadyKnown => Ok(SubmissionAck::AlreadyKnown),
            InsertOutcome::Inserted => {
                debug!(%signing_root, slot = %attestation.data.slot, "Attestation accepted");
                self.broadcaster
                    .broadcast(ATTESTATION_TOPIC, attestation.as_ssz_bytes());
                self.chain_service.receive_attestation(attestation)?;
                Ok(SubmissionAck::Accepted)
            }
        }
    }

    /// Accepts aggregates whose selection proof wins the committee's modulo
    /// draw; invalid ones are dropped, not errored, so one bad item cannot
    /// veto a batch. Returns the number of aggregates stored.
    pub fn submit_aggregate_and_proofs(
        &self,
        aggregates: Vec<SignedAggregateAndProof>,
    ) -> Result<usize, RpcError> {
        let state = self.head.head_state()?;
        let mut accepted = 0;

        for signed in aggregates {
            let message = &signed.message;
            let data = &message.aggregate.data;

            let epoch = data.slot.epoch(self.spec.slots_per_epoch);
            let committee_len = match self
                .live_committee_cache(&state, epoch)
                .and_then(|cache| {
                    cache
                        .get_beacon_committee(data.slot, data.index)
                        .map(|committee| committee.len())
                        .map_err(RpcError::from)
                }) {
                Ok(len) => len,
                Err(e) => {
                    warn!(slot = %data.slot, index = data.index, error = %e,
                        "Dropping aggregate for unknown committee");
                    continue;
                }
            };

            if !is_aggregator(
                committee_len,
                self.spec.target_aggregators_per_committee,
                &signed.message.selection_proof,
            ) {
                warn!(
                    aggregator = message.aggregator_index,
                    slot = %data.slot,
                    "Dropping aggregate with losing selection proof"
                );
                continue;
            }

            if self
                .pool
                .insert_aggregate_attestation(message.aggregate.clone())?
                == InsertOutcome::Inserted
            {
                self.broadcaster
                    .broadcast(AGGREGATE_TOPIC, signed.as_ssz_bytes());
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Forwards a signed block to the block receiver and propagates its
    /// verdict.
    pub fn submit_block(&self, block: SignedBeaconBlock) -> Result<SubmissionAck, RpcError> {
        let root = block.canonical_root();
        let payload = block.as_ssz_bytes();
        match self.chain_service.receive_block(block)? {
            BlockVerdict::Accepted => {
                debug!(%root, "Block accepted");
                self.broadcaster.broadcast(BLOCK_TOPIC, payload);
                Ok(SubmissionAck::Accepted)
            }
            BlockVerdict::AlreadyKnown => Ok(SubmissionAck::AlreadyKnown),
            BlockVerdict::Invalid(reason) => Err(RpcError::invalid_argument(format!(
                "block rejected: {reason}"
            ))),
        }
    }

    pub fn submit_voluntary_exit(
        &self,
        exit: SignedVoluntaryExit,
    ) -> Result<SubmissionAck, RpcError> {
        let state = self.head.head_state()?;
        if exit.message.validator_index >= state.validators.len() as u64 {
            return Err(RpcError::out_of_range(format!(
                "validator index {} beyond the registry",
                exit.message.validator_index
            )));
        }

        self.ack_insert(
            self.pool.insert_voluntary_exit(exit)?,
            EXIT_TOPIC,
            exit.as_ssz_bytes(),
        )
    }

    pub fn submit_proposer_slashing(
        &self,
        slashing: ProposerSlashing,
    ) -> Result<SubmissionAck, RpcError> {
        let header_1 = &slashing.signed_header_1.message;
        let header_2 = &slashing.signed_header_2.message;
        if header_1.proposer_index != header_2.proposer_index {
            return Err(RpcError::invalid_argument(
                "slashing headers name different proposers",
            ));
        }
        if header_1.slot != header_2.slot {
            return Err(RpcError::invalid_argument(
                "slashing headers are for different slots",
            ));
        }
        if header_1 == header_2 {
            return Err(RpcError::invalid_argument(
                "slashing headers are identical",
            ));
        }

        self.ack_insert(
            self.pool.insert_proposer_slashing(slashing)?,
            PROPOSER_SLASHING_TOPIC,
            slashing.as_ssz_bytes(),
        )
    }

    pub fn submit_attester_slashing(
        &self,
        slashing: AttesterSlashing,
    ) -> Result<SubmissionAck, RpcError> {
        let (first, second) = (&slashing.attestation_1, &slashing.attestation_2);
        if !first.is_double_vote(second) && !first.is_surround_vote(second) {
            return Err(RpcError::invalid_argument(
                "attestations are not slashable against each other",
            ));
        }
        if slashing.intersecting_indices().is_empty() {
            return Err(RpcError::invalid_argument(
                "attestations share no attesting indices",
            ));
        }

        let payload = slashing.as_ssz_bytes();
        self.ack_insert(
            self.pool.insert_attester_slashing(slashing)?,
            ATTESTER_SLASHING_TOPIC,
            payload,
        )
    }

    pub fn submit_bls_to_execution_change(
        &self,
        change: SignedBlsToExecutionChange,
    ) -> Result<SubmissionAck, RpcError> {
        let state = self.head.head_state()?;
        if change.message.validator_index >= state.validators.len() as u64 {
            return Err(RpcError::out_of_range(format!(
                "validator index {} beyond the registry",
                change.message.validator_index
            )));
        }

        self.ack_insert(
            self.pool.insert_bls_to_execution_change(change)?,
            BLS_CHANGE_TOPIC,
            change.as_ssz_bytes(),
        )
    }

    pub fn submit_sync_committee_signature(
        &self,
        message: SyncCommitteeMessage,
    ) -> Result<SubmissionAck, RpcError> {
        let state = self.head.head_state()?;
        if message.validator_index >= state.validators.len() as u64 {
            return Err(RpcError::out_of_range(format!(
                "validator index {} beyond the registry",
                message.validator_index
            )));
        }

        self.ack_insert(
            self.pool.insert_sync_committee_message(message)?,
            SYNC_MESSAGE_TOPIC,
            message.as_ssz_bytes(),
        )
    }

    fn ack_insert(
        &self,
        outcome: InsertOutcome,
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<SubmissionAck, RpcError> {
        match outcome {
            InsertOutcome::AlreadyKnown => Ok(SubmissionAck::AlreadyKnown),
            InsertOutcome::Inserted => {
                self.broadcaster.broadcast(topic, payload);
                Ok(SubmissionAck::Accepted)
            }
        }
    }
}

/// The aggregator draw: the first 8 little-endian bytes of the hashed
/// selection proof, modulo the committee's draw threshold.
fn is_aggregator(committee_len: usize, target_aggregators: u64, selection_proof: &types::SignatureBytes) -> bool {
    let modulo = std::cmp::max(1, committee_len as u64 / target_aggregators);
    let digest = hash_fixed(selection_proof.as_slice());
    let value = u64::from_le_bytes(
        digest[..8]
            .try_into()
            .expect("digest is at least 8 bytes long"),
    );
    value % modulo == 0
}
