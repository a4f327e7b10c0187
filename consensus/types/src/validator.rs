use crate::{ChainSpec, Epoch, PublicKeyBytes};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A registry entry. Epoch fields use `ChainSpec::far_future_epoch` as the
/// "unset" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub activation_eligibility_epoch: Epoch,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
    pub slashed: bool,
    #[serde(with = "serde_utils::quoted_u64")]
    pub effective_balance: u64,
}

impl Validator {
    /// Active at `epoch` iff `activation_epoch <= epoch < exit_epoch`.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    pub fn is_exited_at(&self, epoch: Epoch) -> bool {
        self.exit_epoch <= epoch
    }

    pub fn is_withdrawable_at(&self, epoch: Epoch) -> bool {
        self.withdrawable_epoch <= epoch
    }

    pub fn has_initiated_exit(&self, spec: &ChainSpec) -> bool {
        self.exit_epoch != spec.far_future_epoch
    }

    pub fn is_eligible_for_activation_queue(&self, spec: &ChainSpec) -> bool {
        self.activation_eligibility_epoch != spec.far_future_epoch
    }
}

impl Default for Validator {
    /// An unset validator: every epoch field at the far-future sentinel.
    fn default() -> Self {
        Self {
            pubkey: PublicKeyBytes::empty(),
            activation_eligibility_epoch: Epoch::max_value(),
            activation_epoch: Epoch::max_value(),
            exit_epoch: Epoch::max_value(),
            withdrawable_epoch: Epoch::max_value(),
            slashed: false,
            effective_balance: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_window() {
        let v = Validator {
            activation_epoch: Epoch::new(4),
            exit_epoch: Epoch::new(10),
            ..Validator::default()
        };
        assert!(!v.is_active_at(Epoch::new(3)));
        assert!(v.is_active_at(Epoch::new(4)));
        assert!(v.is_active_at(Epoch::new(9)));
        assert!(!v.is_active_at(Epoch::new(10)));
    }

    #[test]
    fn default_is_never_active() {
        let v = Validator::default();
        assert!(!v.is_active_at(Epoch::new(0)));
        assert!(!v.is_active_at(Epoch::max_value() - 1));
    }
}
