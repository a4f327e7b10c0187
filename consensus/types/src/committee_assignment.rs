use crate::{CommitteeIndex, PublicKeyBytes, Slot, ValidatorIndex};
use serde::{Deserialize, Serialize};

/// A validator's duties for one epoch: its committee, where it attests, and
/// the slots (if any) it proposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeAssignment {
    /// Ordered members of the committee the validator belongs to.
    pub committee: Vec<ValidatorIndex>,
    #[serde(with = "serde_utils::quoted_u64")]
    pub committee_index: CommitteeIndex,
    pub attester_slot: Slot,
    /// Empty when the validator proposes nowhere in the epoch.
    pub proposer_slots: Vec<Slot>,
    pub public_key: PublicKeyBytes,
}
