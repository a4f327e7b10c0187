use crate::{
    Attestation, AttesterSlashing, Deposit, Eth1Data, Hash256, MaxAttestations,
    MaxAttesterSlashings, MaxBlsToExecutionChanges, MaxDeposits, MaxProposerSlashings,
    MaxVoluntaryExits, ProposerSlashing, SignatureBytes, SignedBlsToExecutionChange,
    SignedVoluntaryExit, Slot, ValidatorIndex, VariableList,
};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

/// The operations carried by a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlockBody {
    pub randao_reveal: SignatureBytes,
    pub eth1_data: Eth1Data,
    pub graffiti: Hash256,
    pub proposer_slashings: VariableList<ProposerSlashing, MaxProposerSlashings>,
    pub attester_slashings: VariableList<AttesterSlashing, MaxAttesterSlashings>,
    pub attestations: VariableList<Attestation, MaxAttestations>,
    pub deposits: VariableList<Deposit, MaxDeposits>,
    pub voluntary_exits: VariableList<SignedVoluntaryExit, MaxVoluntaryExits>,
    pub bls_to_execution_changes: VariableList<SignedBlsToExecutionChange, MaxBlsToExecutionChanges>,
}

/// An unsigned block template.
///
/// `state_root` is zero when produced for signing; the state transition owns
/// its final value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconBlock {
    pub slot: Slot,
    #[serde(with = "serde_utils::quoted_u64")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body: BeaconBlockBody,
}

impl BeaconBlock {
    /// An empty template at `slot`, used as the assembly starting point.
    pub fn empty(slot: Slot) -> Self {
        Self {
            slot,
            proposer_index: 0,
            parent_root: Hash256::ZERO,
            state_root: Hash256::ZERO,
            body: BeaconBlockBody {
                randao_reveal: SignatureBytes::empty(),
                eth1_data: Eth1Data::default(),
                graffiti: Hash256::ZERO,
                proposer_slashings: VariableList::empty(),
                attester_slashings: VariableList::empty(),
                attestations: VariableList::empty(),
                deposits: VariableList::empty(),
                voluntary_exits: VariableList::empty(),
                bls_to_execution_changes: VariableList::empty(),
            },
        }
    }

    pub fn canonical_root(&self) -> Hash256 {
        self.tree_hash_root()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
    pub signature: SignatureBytes,
}

impl SignedBeaconBlock {
    pub fn from_block(message: BeaconBlock, signature: SignatureBytes) -> Self {
        Self { message, signature }
    }

    pub fn slot(&self) -> Slot {
        self.message.slot
    }

    /// Root of the unsigned message, the block's canonical identifier.
    pub fn canonical_root(&self) -> Hash256 {
        self.message.tree_hash_root()
    }
}
