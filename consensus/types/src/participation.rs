use serde::{Deserialize, Serialize};

/// Attestation participation over one epoch, weighted by effective balance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatorParticipation {
    /// `voted_ether / eligible_ether`.
    pub global_participation_rate: f32,
    #[serde(with = "serde_utils::quoted_u64")]
    pub voted_ether: u64,
    #[serde(with = "serde_utils::quoted_u64")]
    pub eligible_ether: u64,
    /// Whether the epoch is at or below the finalized checkpoint.
    pub finalized: bool,
}
