use crate::compute_shuffled_index::{decision_bit, round_pivot, window_hash};
use crate::SEED_SIZE;

/// Memoizes the hash material of the shuffle so that each 256-index decision
/// window is hashed at most once per round.
struct ShuffleContext<'a> {
    seed: &'a [u8],
    list_size: usize,
    pivots: Vec<usize>,
    /// `windows[round][window]` is the lazily computed decision hash.
    windows: Vec<Vec<Option<[u8; 32]>>>,
}

impl<'a> ShuffleContext<'a> {
    fn new(seed: &'a [u8], rounds: u8, list_size: usize) -> Self {
        let window_count = list_size / 256 + 1;
        ShuffleContext {
            seed,
            list_size,
            pivots: (0..rounds)
                .map(|round| round_pivot(seed, round, list_size))
                .collect(),
            windows: vec![vec![None; window_count]; rounds as usize],
        }
    }

    fn shuffled_index(&mut self, mut index: usize) -> usize {
        for round in 0..self.pivots.len() {
            let pivot = self.pivots[round];
            let flip = (pivot + (self.list_size - index)) % self.list_size;
            let position = index.max(flip);
            let source = self.window(round, position / 256);
            if decision_bit(&source, position) {
                index = flip;
            }
        }
        index
    }

    fn window(&mut self, round: usize, window: usize) -> [u8; 32] {
        *self.windows[round][window]
            .get_or_insert_with(|| window_hash(self.seed, round as u8, window))
    }
}

/// Shuffles an entire list with the swap-or-not permutation.
///
/// `output[i] == input[compute_shuffled_index(i, n, seed, rounds)]`, so a
/// committee with global offset bounds `[start, end)` is exactly
/// `shuffle_list(input, ..)[start..end]`.
///
/// Returns `None` for the same degenerate inputs as `compute_shuffled_index`,
/// except that an empty input list shuffles to an empty list.
pub fn shuffle_list(input: Vec<usize>, rounds: u8, seed: &[u8]) -> Option<Vec<usize>> {
    if input.is_empty() {
        return Some(input);
    }
    if seed.len() < SEED_SIZE || input.len() > usize::MAX / 2 {
        return None;
    }

    let mut context = ShuffleContext::new(seed, rounds, input.len());
    Some(
        (0..input.len())
            .map(|position| input[context.shuffled_index(position)])
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_shuffled_index;
    use rand::Rng;

    const TEST_ROUNDS: u8 = 90;

    #[test]
    fn empty_list_shuffles_to_empty() {
        assert_eq!(shuffle_list(vec![], TEST_ROUNDS, &[42; 32]), Some(vec![]));
    }

    #[test]
    fn short_seed_is_rejected() {
        assert_eq!(shuffle_list(vec![0, 1, 2], TEST_ROUNDS, &[42; 16]), None);
    }

    #[test]
    fn agrees_with_single_index_form() {
        let mut rng = rand::rng();
        for list_size in [1, 2, 3, 255, 256, 257, 1000] {
            let seed: [u8; 32] = rng.random();
            let input: Vec<usize> = (0..list_size).collect();
            let shuffled = shuffle_list(input.clone(), TEST_ROUNDS, &seed)
                .expect("valid inputs shuffle");
            for (position, value) in shuffled.iter().enumerate() {
                let expected = compute_shuffled_index(position, list_size, &seed, TEST_ROUNDS)
                    .expect("position is in bounds");
                assert_eq!(*value, input[expected]);
            }
        }
    }

    #[test]
    fn output_is_a_permutation_of_the_input() {
        let input: Vec<usize> = (100..600).collect();
        let mut shuffled =
            shuffle_list(input.clone(), TEST_ROUNDS, &[7; 32]).expect("valid inputs shuffle");
        assert_ne!(shuffled, input, "shuffle should move elements");
        shuffled.sort_unstable();
        assert_eq!(shuffled, input);
    }

    #[test]
    fn non_contiguous_input_values_are_preserved() {
        let input = vec![3, 14, 15, 92, 65, 35];
        let mut shuffled =
            shuffle_list(input.clone(), TEST_ROUNDS, &[9; 32]).expect("valid inputs shuffle");
        shuffled.sort_unstable();
        let mut sorted_input = input;
        sorted_input.sort_unstable();
        assert_eq!(shuffled, sorted_input);
    }
}
