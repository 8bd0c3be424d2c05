//! Fixed-size block splitting.

/// Default block size: 256 KiB.
pub const BLOCK_SIZE: usize = 256 * 1024;

/// How a file's bytes are laid out in the DAG.
#[derive(Debug, Clone)]
pub enum Split<'a> {
    /// Shorter than one block: stored as a single blob.
    Single(&'a [u8]),
    /// One block or more: stored as a list of block blobs.
    Blocks(std::slice::Chunks<'a, u8>),
}

/// Decide how `data` is split for a block size of `block_size`.
///
/// Data shorter than `block_size` is a single block. Anything else is cut into
/// `ceil(len / block_size)` blocks of exactly `block_size` bytes, except for a
/// shorter final block holding the remainder. The decision depends only on
/// the length of `data`.
///
/// # Panics
///
/// Panics if `block_size` is zero. [`crate::DagConfig`] rejects that value.
pub fn split(data: &[u8], block_size: usize) -> Split<'_> {
    assert!(block_size > 0, "block size must be non-zero");
    if data.len() < block_size {
        Split::Single(data)
    } else {
        Split::Blocks(data.chunks(block_size))
    }
}

/// Number of blocks a split list of `len` bytes has (0 for single blobs).
pub fn block_count(len: usize, block_size: usize) -> usize {
    if len < block_size {
        0
    } else {
        len.div_ceil(block_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_sizes(data: &[u8], block_size: usize) -> Option<Vec<usize>> {
        match split(data, block_size) {
            Split::Single(_) => None,
            Split::Blocks(blocks) => Some(blocks.map(|b| b.len()).collect()),
        }
    }

    #[test]
    fn test_small_data_is_single() {
        let data = vec![7u8; 100];
        match split(&data, BLOCK_SIZE) {
            Split::Single(bytes) => assert_eq!(bytes, &data[..]),
            Split::Blocks(_) => panic!("expected a single block"),
        }
    }

    #[test]
    fn test_empty_data_is_single() {
        assert!(matches!(split(&[], BLOCK_SIZE), Split::Single(b) if b.is_empty()));
    }

    #[test]
    fn test_exact_block_size_is_one_block_list() {
        // The boundary is `< B`: exactly B bytes goes down the list path
        let data = vec![0u8; 16];
        assert_eq!(block_sizes(&data, 16), Some(vec![16]));
    }

    #[test]
    fn test_just_below_block_size_is_single() {
        let data = vec![0u8; 15];
        assert_eq!(block_sizes(&data, 16), None);
    }

    #[test]
    fn test_one_past_block_size_has_short_tail() {
        let data = vec![0u8; 17];
        assert_eq!(block_sizes(&data, 16), Some(vec![16, 1]));
    }

    #[test]
    fn test_exact_multiple() {
        let data = vec![0u8; 2 * BLOCK_SIZE];
        assert_eq!(
            block_sizes(&data, BLOCK_SIZE),
            Some(vec![BLOCK_SIZE, BLOCK_SIZE])
        );
    }

    #[test]
    fn test_blocks_preserve_order() {
        let data: Vec<u8> = (0..40u8).collect();
        let Split::Blocks(blocks) = split(&data, 16) else {
            panic!("expected blocks");
        };
        let rejoined: Vec<u8> = blocks.flatten().copied().collect();
        assert_eq!(rejoined, data);
    }

    #[test]
    fn test_block_count() {
        assert_eq!(block_count(0, 16), 0);
        assert_eq!(block_count(15, 16), 0);
        assert_eq!(block_count(16, 16), 1);
        assert_eq!(block_count(17, 16), 2);
        assert_eq!(block_count(32, 16), 2);
        assert_eq!(block_count(33, 16), 3);
    }

    #[test]
    #[should_panic(expected = "block size must be non-zero")]
    fn test_zero_block_size_panics() {
        let _ = split(b"abc", 0);
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Block sizes always sum to the input length and never exceed B
        #[test]
        fn prop_blocks_cover_input(len in 0usize..4096, block_size in 1usize..512) {
            let data = vec![0u8; len];
            match block_sizes(&data, block_size) {
                None => prop_assert!(len < block_size),
                Some(sizes) => {
                    prop_assert!(len >= block_size);
                    prop_assert_eq!(sizes.len(), block_count(len, block_size));
                    prop_assert_eq!(sizes.iter().sum::<usize>(), len);
                    prop_assert!(sizes.iter().all(|s| *s <= block_size && *s > 0));
                    let (last, full) = sizes.split_last().unwrap();
                    prop_assert!(full.iter().all(|s| *s == block_size));
                    prop_assert!(*last > 0);
                }
            }
        }
    }
}
