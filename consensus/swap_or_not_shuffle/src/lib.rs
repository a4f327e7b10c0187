//! The "swap-or-not" shuffle: a volume-preserving permutation on `[0, n)`
//! derived from a 32-byte seed.
//!
//! Committees are contiguous slices of the shuffled active-index list, so the
//! shuffle must be bit-exact across implementations. Two forms are provided:
//!
//! - [`compute_shuffled_index`] permutes a single index;
//! - [`shuffle_list`] permutes a whole list, memoizing the per-round hash
//!   material so each 256-index window is hashed once per round.

mod compute_shuffled_index;
mod shuffle_list;

pub use compute_shuffled_index::compute_shuffled_index;
pub use shuffle_list::shuffle_list;

pub(crate) const SEED_SIZE: usize = 32;
pub(crate) const ROUND_SIZE: usize = 1;
pub(crate) const POSITION_WINDOW_SIZE: usize = 4;
pub(crate) const PIVOT_VIEW_SIZE: usize = SEED_SIZE + ROUND_SIZE;
pub(crate) const TOTAL_SIZE: usize = SEED_SIZE + ROUND_SIZE + POSITION_WINDOW_SIZE;
