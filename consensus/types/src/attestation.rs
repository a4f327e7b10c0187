use crate::{AttestationData, BitList, MaxValidatorsPerCommittee, SignatureBytes};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// An attestation, possibly aggregated.
///
/// `aggregation_bits` is indexed by committee position. Two attestations are
/// *mergeable* iff their `data` is equal and their bits are disjoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Attestation {
    pub aggregation_bits: BitList<MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

impl Attestation {
    /// An unsigned, unset-bits attestation for a committee of `committee_len`.
    pub fn empty_for_signing(
        data: AttestationData,
        committee_len: usize,
    ) -> Result<Self, ssz_types::Error> {
        Ok(Self {
            aggregation_bits: BitList::with_capacity(committee_len).map_err(
                |e| match e {
                    ssz::BitfieldError::OutOfBounds { i, len } => {
                        ssz_types::Error::OutOfBounds { i, len }
                    }
                    ssz::BitfieldError::MissingLengthInformation => {
                        ssz_types::Error::MissingLengthInformation
                    }
                    ssz::BitfieldError::ExcessBits => ssz_types::Error::ExcessBits,
                    ssz::BitfieldError::InvalidByteCount { given, expected } => {
                        ssz_types::Error::InvalidByteCount { given, expected }
                    }
                },
            )?,
            data,
            signature: SignatureBytes::empty(),
        })
    }

    /// True iff no committee member is set in both attestations.
    pub fn signers_disjoint_from(&self, other: &Self) -> bool {
        self.aggregation_bits
            .intersection(&other.aggregation_bits)
            .is_zero()
    }

    /// True iff every signer of `self` also signed `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.aggregation_bits.intersection(&other.aggregation_bits)
            == self.aggregation_bits
    }

    pub fn num_set_bits(&self) -> usize {
        self.aggregation_bits.num_set_bits()
    }
}
