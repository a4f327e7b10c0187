use crate::{PIVOT_VIEW_SIZE, SEED_SIZE, TOTAL_SIZE};
use ethereum_hashing::hash_fixed;

/// Returns the index that `index` occupies after applying the swap-or-not
/// permutation on `[0, list_size)` with the given `seed`.
///
/// Each round draws a pivot from `H(seed || round)` and conditionally swaps
/// `index` with `(pivot + list_size - index) % list_size`, the decision bit
/// coming from `H(seed || round || position / 256)`.
///
/// Returns `None` under any of the following conditions:
///
/// - `list_size == 0`
/// - `index >= list_size`
/// - `seed.len() < 32`
/// - `list_size > usize::MAX / 2`
pub fn compute_shuffled_index(
    index: usize,
    list_size: usize,
    seed: &[u8],
    shuffle_round_count: u8,
) -> Option<usize> {
    if list_size == 0
        || index >= list_size
        || seed.len() < SEED_SIZE
        || list_size > usize::MAX / 2
    {
        return None;
    }

    let mut index = index;
    for round in 0..shuffle_round_count {
        let pivot = round_pivot(seed, round, list_size);
        index = do_round(seed, index, pivot, round, list_size);
    }
    Some(index)
}

/// Draws the pivot for `round` from the first 8 bytes of `H(seed || round)`.
pub(crate) fn round_pivot(seed: &[u8], round: u8, list_size: usize) -> usize {
    let mut buf = [0; PIVOT_VIEW_SIZE];
    buf[..SEED_SIZE].copy_from_slice(&seed[..SEED_SIZE]);
    buf[SEED_SIZE] = round;
    let digest = hash_fixed(&buf);
    let raw = u64::from_le_bytes(
        digest[..8]
            .try_into()
            .expect("digest is at least 8 bytes long"),
    );
    (raw % list_size as u64) as usize
}

/// Hashes the 256-index decision window containing `position` for `round`.
pub(crate) fn window_hash(seed: &[u8], round: u8, window: usize) -> [u8; 32] {
    let mut buf = [0; TOTAL_SIZE];
    buf[..SEED_SIZE].copy_from_slice(&seed[..SEED_SIZE]);
    buf[SEED_SIZE] = round;
    buf[PIVOT_VIEW_SIZE..].copy_from_slice(&(window as u32).to_le_bytes());
    hash_fixed(&buf)
}

/// Extracts the swap decision for `position` from its window hash.
pub(crate) fn decision_bit(source: &[u8; 32], position: usize) -> bool {
    let byte = source[(position % 256) / 8];
    (byte >> (position % 8)) % 2 == 1
}

fn do_round(seed: &[u8], index: usize, pivot: usize, round: u8, list_size: usize) -> usize {
    let flip = (pivot + (list_size - index)) % list_size;
    let position = index.max(flip);
    let source = window_hash(seed, round, position / 256);
    if decision_bit(&source, position) {
        flip
    } else {
        index
    }
}
