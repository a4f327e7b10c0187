use serde::{Deserialize, Serialize};

/// The lifecycle state of a validator as seen at a given epoch.
///
/// Classification walks a fixed decision ladder over the registry entry (or
/// its absence) and the current epoch; see the duty-resolution module for the
/// ladder itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorStatus {
    /// No registry entry and no deposit observed.
    Unknown,
    /// Deposit observed but not yet included in the registry.
    Deposited,
    /// In the registry, waiting for its activation epoch.
    Pending,
    Active,
    /// Exit initiated but not yet reached.
    Exiting,
    Exited,
    /// Exited as a consequence of being slashed.
    ExitedSlashed,
    /// Past the withdrawable epoch.
    Withdrawable,
}

impl std::fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ValidatorStatus::Unknown => "UNKNOWN",
            ValidatorStatus::Deposited => "DEPOSITED",
            ValidatorStatus::Pending => "PENDING",
            ValidatorStatus::Active => "ACTIVE",
            ValidatorStatus::Exiting => "EXITING",
            ValidatorStatus::Exited => "EXITED",
            ValidatorStatus::ExitedSlashed => "EXITED_SLASHED",
            ValidatorStatus::Withdrawable => "WITHDRAWABLE",
        };
        write!(f, "{s}")
    }
}
