use crate::{DepositProofLen, FixedVector, Hash256, PublicKeyBytes, SignatureBytes};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The signed content of a deposit-contract log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct DepositData {
    pub pubkey: PublicKeyBytes,
    pub withdrawal_credentials: Hash256,
    #[serde(with = "serde_utils::quoted_u64")]
    pub amount: u64,
    pub signature: SignatureBytes,
}

/// A deposit ready for block inclusion: the data plus its Merkle branch
/// against the deposit root (tree depth + 1 items, the extra item being the
/// length mix-in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Deposit {
    pub proof: FixedVector<Hash256, DepositProofLen>,
    pub data: DepositData,
}

/// A deposit log entry as tracked by the deposit cache. Indices are dense,
/// monotonically increasing and gap-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositContainer {
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: u64,
    pub deposit_data: DepositData,
    #[serde(with = "serde_utils::quoted_u64")]
    pub eth1_block_height: u64,
}
