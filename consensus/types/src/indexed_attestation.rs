use crate::{AttestationData, MaxValidatorsPerCommittee, SignatureBytes, VariableList};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// An attestation with its signers listed by validator index rather than by
/// committee bitfield; the form consumed by slashing detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct IndexedAttestation {
    #[serde(with = "quoted_u64_var_list")]
    pub attesting_indices: VariableList<u64, MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

impl IndexedAttestation {
    /// True iff the two attestations share a target epoch with different
    /// data: the "double vote" slashing condition.
    pub fn is_double_vote(&self, other: &Self) -> bool {
        self.data.target.epoch == other.data.target.epoch && self.data != other.data
    }

    /// True iff `self` surrounds `other`: the "surround vote" slashing
    /// condition.
    pub fn is_surround_vote(&self, other: &Self) -> bool {
        self.data.source.epoch < other.data.source.epoch
            && other.data.target.epoch < self.data.target.epoch
    }
}

mod quoted_u64_var_list {
    use super::*;
    use serde::de::Error;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        list: &VariableList<u64, MaxValidatorsPerCommittee>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(list.len()))?;
        for value in list.iter() {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<VariableList<u64, MaxValidatorsPerCommittee>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        let values = strings
            .iter()
            .map(|s| s.parse::<u64>().map_err(D::Error::custom))
            .collect::<Result<Vec<_>, _>>()?;
        VariableList::new(values).map_err(|e| D::Error::custom(format!("{e:?}")))
    }
}
