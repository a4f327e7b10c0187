//! Semantic types of the validator-facing consensus core.
//!
//! Wire-format independent: SSZ and tree-hash impls exist so that signing
//! roots and deposit leaves can be computed, not to pin a transport encoding.

pub mod active_set_changes;
pub mod aggregate_and_proof;
pub mod attestation;
pub mod attestation_data;
pub mod attestation_duty;
pub mod attester_slashing;
pub mod beacon_block;
pub mod beacon_block_header;
pub mod beacon_state;
pub mod bls_to_execution_change;
pub mod chain_head;
pub mod chain_spec;
pub mod checkpoint;
pub mod committee_assignment;
pub mod committee_cache;
pub mod deposit;
pub mod errors;
pub mod eth1_data;
pub mod indexed_attestation;
pub mod participation;
pub mod proposer_slashing;
pub mod public_key_bytes;
pub mod signature_bytes;
pub mod slot_epoch;
pub mod sync_committee_message;
pub mod test_utils;
pub mod validator;
pub mod validator_status;
pub mod voluntary_exit;

pub use active_set_changes::ActiveSetChanges;
pub use aggregate_and_proof::{AggregateAndProof, SignedAggregateAndProof};
pub use attestation::Attestation;
pub use attestation_data::AttestationData;
pub use attestation_duty::AttestationDuty;
pub use attester_slashing::AttesterSlashing;
pub use beacon_block::{BeaconBlock, BeaconBlockBody, SignedBeaconBlock};
pub use beacon_block_header::{BeaconBlockHeader, SignedBeaconBlockHeader};
pub use beacon_state::{
    BeaconStateSnapshot, SeedDomain, compute_proposer_index, slot_proposer_seed,
};
pub use bls_to_execution_change::{BlsToExecutionChange, SignedBlsToExecutionChange};
pub use chain_head::ChainHead;
pub use chain_spec::ChainSpec;
pub use checkpoint::Checkpoint;
pub use committee_assignment::CommitteeAssignment;
pub use committee_cache::{CommitteeCache, compute_committee};
pub use deposit::{Deposit, DepositContainer, DepositData};
pub use errors::BeaconStateError;
pub use eth1_data::Eth1Data;
pub use fixed_bytes::{Address, FixedBytesExtended, Hash256};
pub use indexed_attestation::IndexedAttestation;
pub use participation::ValidatorParticipation;
pub use proposer_slashing::ProposerSlashing;
pub use public_key_bytes::{PUBLIC_KEY_BYTES_LEN, PublicKeyBytes};
pub use signature_bytes::{SIGNATURE_BYTES_LEN, SignatureBytes};
pub use slot_epoch::{Epoch, Slot};
pub use sync_committee_message::SyncCommitteeMessage;
pub use validator::Validator;
pub use validator_status::ValidatorStatus;
pub use voluntary_exit::{SignedVoluntaryExit, VoluntaryExit};

pub use ssz_types::{BitList, FixedVector, VariableList, typenum};

/// Dense index into the validator registry.
pub type ValidatorIndex = u64;
/// Index of a committee within a slot.
pub type CommitteeIndex = u64;
/// A hash tree root.
pub type Root = Hash256;

/// Upper bound on committee size, fixing the `BitList` capacity of
/// attestation aggregation bits.
pub type MaxValidatorsPerCommittee = typenum::U2048;
/// Bounds for operations carried in a block body.
pub type MaxProposerSlashings = typenum::U16;
pub type MaxAttesterSlashings = typenum::U2;
pub type MaxAttestations = typenum::U128;
pub type MaxDeposits = typenum::U16;
pub type MaxVoluntaryExits = typenum::U16;
pub type MaxBlsToExecutionChanges = typenum::U16;
/// Deposit proof length: tree depth plus the length mix-in.
pub type DepositProofLen = typenum::U33;
