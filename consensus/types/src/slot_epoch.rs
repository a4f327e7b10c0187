//! The `Slot` and `Epoch` newtypes.
//!
//! Plain `u64` wrappers so that slot/epoch arithmetic cannot be mixed up by
//! accident. Serde encodes both as quoted decimal strings, matching the rest
//! of the consensus ecosystem.

use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use std::fmt;
use std::iter::Iterator;

#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode,
    Decode,
)]
#[serde(transparent)]
#[ssz(struct_behaviour = "transparent")]
pub struct Slot(#[serde(with = "serde_utils::quoted_u64")] u64);

#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode,
    Decode,
)]
#[serde(transparent)]
#[ssz(struct_behaviour = "transparent")]
pub struct Epoch(#[serde(with = "serde_utils::quoted_u64")] u64);

macro_rules! impl_tree_hash_transparent {
    ($main:ident) => {
        impl tree_hash::TreeHash for $main {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                u64::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> tree_hash::PackedEncoding {
                self.0.tree_hash_packed_encoding()
            }

            fn tree_hash_packing_factor() -> usize {
                u64::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> tree_hash::Hash256 {
                self.0.tree_hash_root()
            }
        }
    };
}

impl_tree_hash_transparent!(Slot);
impl_tree_hash_transparent!(Epoch);

macro_rules! impl_common {
    ($main:ident) => {
        impl $main {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub const fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub const fn max_value() -> Self {
                Self(u64::MAX)
            }

            pub fn saturating_add<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_add(other.into()))
            }

            pub fn saturating_sub<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_sub(other.into()))
            }

            pub fn checked_sub<T: Into<u64>>(&self, other: T) -> Option<Self> {
                self.0.checked_sub(other.into()).map(Self)
            }

            pub fn safe_add<T: Into<u64>>(&self, other: T) -> Result<Self, ArithError> {
                self.0.safe_add(other.into()).map(Self)
            }

            pub fn safe_sub<T: Into<u64>>(&self, other: T) -> Result<Self, ArithError> {
                self.0.safe_sub(other.into()).map(Self)
            }
        }

        impl From<u64> for $main {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$main> for u64 {
            fn from(value: $main) -> u64 {
                value.0
            }
        }

        impl fmt::Display for $main {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $main {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}({})", stringify!($main), self.0)
            }
        }

        impl std::ops::Add<u64> for $main {
            type Output = Self;
            fn add(self, other: u64) -> Self {
                Self(self.0 + other)
            }
        }

        impl std::ops::Add<$main> for $main {
            type Output = Self;
            fn add(self, other: Self) -> Self {
                Self(self.0 + other.0)
            }
        }

        impl std::ops::AddAssign<u64> for $main {
            fn add_assign(&mut self, other: u64) {
                self.0 += other;
            }
        }

        impl std::ops::Sub<u64> for $main {
            type Output = Self;
            fn sub(self, other: u64) -> Self {
                Self(self.0 - other)
            }
        }

        impl std::ops::Sub<$main> for $main {
            type Output = Self;
            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }

        impl std::ops::Mul<u64> for $main {
            type Output = Self;
            fn mul(self, other: u64) -> Self {
                Self(self.0 * other)
            }
        }

        impl std::ops::Div<u64> for $main {
            type Output = Self;
            fn div(self, other: u64) -> Self {
                Self(self.0 / other)
            }
        }

        impl std::ops::Rem<u64> for $main {
            type Output = Self;
            fn rem(self, other: u64) -> Self {
                Self(self.0 % other)
            }
        }

        impl PartialEq<u64> for $main {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl PartialOrd<u64> for $main {
            fn partial_cmp(&self, other: &u64) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }
    };
}

impl_common!(Slot);
impl_common!(Epoch);

impl Slot {
    /// The epoch this slot belongs to.
    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0 / slots_per_epoch)
    }
}

impl Epoch {
    /// The first slot of this epoch.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    /// The last slot of this epoch.
    pub fn end_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(
            self.0
                .saturating_add(1)
                .saturating_mul(slots_per_epoch)
                .saturating_sub(1),
        )
    }

    /// Iterates every slot of this epoch in order.
    pub fn slot_iter(&self, slots_per_epoch: u64) -> impl Iterator<Item = Slot> + use<> {
        let start = self.start_slot(slots_per_epoch).as_u64();
        (start..start + slots_per_epoch).map(Slot::new)
    }
}
