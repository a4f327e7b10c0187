use crate::IndexedAttestation;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Evidence that a set of validators signed conflicting attestations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct AttesterSlashing {
    pub attestation_1: IndexedAttestation,
    pub attestation_2: IndexedAttestation,
}

impl AttesterSlashing {
    /// Indices attested in both conflicting attestations, in ascending order.
    pub fn intersecting_indices(&self) -> Vec<u64> {
        let first: std::collections::BTreeSet<_> =
            self.attestation_1.attesting_indices.iter().copied().collect();
        self.attestation_2
            .attesting_indices
            .iter()
            .copied()
            .filter(|index| first.contains(index))
            .collect()
    }
}
