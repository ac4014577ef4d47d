//! Provides list-shuffling functions matching the Ethereum consensus specification.
//!
//! See
//! [compute_shuffled_index](https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/beacon-chain.md#compute_shuffled_index)
//! for specifications.
//!
//! There are two functions exported by this crate:
//!
//! - `compute_shuffled_index`: given a single index, computes the index resulting from a shuffle.
//!   Runs in less time than it takes to run `shuffle_list`.
//! - `shuffle_list`: shuffles an entire list in-place. Runs in less time than it takes to run
//!   `compute_shuffled_index` on each index.
//!
//! In general, use `compute_shuffled_index` to calculate the shuffling of a small subset of a much
//! larger list (~250x larger is a good guide, but solid figures yet to be calculated).

mod compute_shuffled_index;
mod shuffle_list;

pub use compute_shuffled_index::compute_shuffled_index;
pub use shuffle_list::shuffle_list;

type Hash256 = ethereum_types::H256;

#[cfg(test)]
mod tests {
    use super::*;

    fn shuffled_via_single_index(seed: &[u8], list_size: usize, rounds: u8) -> Vec<usize> {
        (0..list_size)
            .map(|i| {
                compute_shuffled_index(i, list_size, seed, rounds)
                    .expect("index is in bounds and seed is 32 bytes")
            })
            .collect()
    }

    #[test]
    fn single_index_matches_list_shuffle() {
        let seed = Hash256::from_low_u64_be(42);

        for list_size in [1_usize, 2, 3, 7, 32, 99] {
            let input: Vec<usize> = (0..list_size).collect();
            let shuffled = shuffle_list(input, 90, seed.as_bytes(), false)
                .expect("shuffle_list succeeds on non-empty lists");

            // With `forwards == false` the whole-list shuffle must agree with the per-index
            // function, i.e. `shuffled[i] == input[compute_shuffled_index(i)]`.
            let index_map = shuffled_via_single_index(seed.as_bytes(), list_size, 90);

            assert_eq!(shuffled, index_map, "list_size: {}", list_size);
        }
    }

    #[test]
    fn returns_none_for_out_of_bounds() {
        assert_eq!(compute_shuffled_index(1, 1, &[0; 32], 90), None);
        assert_eq!(compute_shuffled_index(0, 0, &[0; 32], 90), None);
    }

    #[test]
    fn shuffles_differ_by_seed() {
        let input: Vec<usize> = (0..128).collect();

        let a = shuffle_list(input.clone(), 90, &[1; 32], false).unwrap();
        let b = shuffle_list(input, 90, &[2; 32], false).unwrap();

        assert_ne!(a, b);
    }
}
