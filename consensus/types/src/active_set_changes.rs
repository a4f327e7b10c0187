use crate::ValidatorIndex;
use serde::{Deserialize, Serialize};

/// Validators entering or leaving the active set at an epoch boundary.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSetChanges {
    pub activated: Vec<ValidatorIndex>,
    pub exited: Vec<ValidatorIndex>,
    pub slashed: Vec<ValidatorIndex>,
}
