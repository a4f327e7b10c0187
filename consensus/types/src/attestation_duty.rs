use crate::{CommitteeIndex, Slot};
use serde::{Deserialize, Serialize};

/// Where a validator attests within an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationDuty {
    /// The slot during which the validator must attest.
    pub slot: Slot,
    /// The committee within the slot.
    #[serde(with = "serde_utils::quoted_u64")]
    pub index: CommitteeIndex,
    /// The validator's position within the committee.
    pub committee_position: usize,
    /// The committee's size.
    pub committee_len: usize,
    /// Number of committees at the duty's slot.
    pub committees_at_slot: u64,
}
