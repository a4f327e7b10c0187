use crate::{Epoch, Slot, ValidatorIndex};
use safe_arith::ArithError;

#[derive(Debug, PartialEq, Clone)]
pub enum BeaconStateError {
    /// Committee or proposer derivation over an empty active set.
    EmptyValidatorSet,
    UnknownValidator(ValidatorIndex),
    /// The slot is outside the range covered by this snapshot.
    SlotOutOfBounds(Slot),
    /// The epoch is not derivable from this snapshot's vectors.
    EpochOutOfBounds(Epoch),
    /// The committee cache was asked about an epoch it was not built for.
    CommitteeCacheUninitialized(Option<Epoch>),
    /// No committee exists at the requested (slot, index).
    NoCommittee {
        slot: Slot,
        index: u64,
    },
    /// Committee index at or beyond the committee count.
    InvalidCommitteeIndex {
        index: u64,
        count: u64,
    },
    /// The shuffle rejected its inputs.
    UnableToShuffle,
    ArithError(ArithError),
}

impl From<ArithError> for BeaconStateError {
    fn from(e: ArithError) -> Self {
        BeaconStateError::ArithError(e)
    }
}
