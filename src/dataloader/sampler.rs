use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Seed of the generator that loads batch `batch_number` in a pass whose base
/// seed is `base_seed`.
///
/// Every batch gets a distinct stream that does not depend on which worker
/// loads it or on what else the pool is running.
pub fn batch_seed(base_seed: u64, batch_number: usize) -> u64 {
    base_seed.wrapping_add(batch_number as u64)
}

/// Sample order for one pass: a permutation of `0..len` when `rng` is given,
/// the dataset order otherwise.
pub fn sample_order(len: usize, rng: Option<&mut StdRng>) -> Vec<usize> {
    // .collect() can use size_hint from std::ops::Range
    let mut indices: Vec<usize> = (0..len).collect();
    if let Some(rng) = rng {
        indices.shuffle(rng);
    }
    indices
}

/// Splits `indices` into chunks of `batch_size`, keeping a short tail only
/// when `drop_last` is off.
pub fn partition(indices: &[usize], batch_size: usize, drop_last: bool) -> Vec<Vec<usize>> {
    indices
        .chunks(batch_size)
        .filter(|chunk| !drop_last || chunk.len() == batch_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

pub fn num_batches(len: usize, batch_size: usize, drop_last: bool) -> usize {
    if drop_last {
        len / batch_size
    } else {
        len.div_ceil(batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn same_seed_same_permutation() {
        let a = sample_order(100, Some(&mut StdRng::seed_from_u64(5)));
        let b = sample_order(100, Some(&mut StdRng::seed_from_u64(5)));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn no_rng_keeps_dataset_order() {
        assert_eq!(sample_order(4, None), vec![0, 1, 2, 3]);
    }

    #[test]
    fn partition_drops_short_tail() {
        let indices: Vec<usize> = (0..10).collect();
        let batches = partition(&indices, 3, true);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 3));
        assert_eq!(num_batches(10, 3, true), 3);
    }

    #[test]
    fn partition_keeps_tail_when_asked() {
        let indices: Vec<usize> = (0..10).collect();
        let batches = partition(&indices, 3, false);
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[3], vec![9]);
        assert_eq!(num_batches(10, 3, false), 4);
    }

    #[test]
    fn batch_seeds_are_distinct() {
        let seeds: Vec<u64> = (0..4).map(|i| batch_seed(u64::MAX - 1, i)).collect();
        assert_eq!(seeds, vec![u64::MAX - 1, u64::MAX, 0, 1]);
    }
}
