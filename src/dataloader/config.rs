use super::error::DataLoaderError;

/// Seed used by the evaluation runs when none is given.
pub const DEFAULT_SHUFFLE_SEED: u64 = 2_147_483_647;

/// Batching and prefetch settings for a [`DataLoader`](super::dataloader::DataLoader).
///
/// `build()` rejects a zero `batch_size` or `prefetch_count`. A zero
/// `num_workers` loads batches on the calling thread.
#[derive(Clone, Debug)]
pub struct DataLoaderConfig {
    pub prefetch_count: usize,
    pub batch_size: usize,
    pub num_workers: usize,
    pub shuffle: bool,
    pub shuffle_seed: Option<u64>,
    pub drop_last: bool,
}

impl DataLoaderConfig {
    pub fn build(self) -> Result<Self, DataLoaderError> {
        if self.batch_size == 0 {
            return Err(DataLoaderError::InvalidBatchSize(self.batch_size));
        }
        if self.prefetch_count == 0 {
            return Err(DataLoaderError::InvalidPrefetchCount(self.prefetch_count));
        }

        Ok(self)
    }
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            prefetch_count: 4,
            batch_size: 1024,
            num_workers: num_cpus::get(),
            shuffle: true,
            shuffle_seed: Some(DEFAULT_SHUFFLE_SEED),
            drop_last: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_batch_size() {
        let config = DataLoaderConfig { batch_size: 0, ..Default::default() };
        assert!(matches!(config.build(), Err(DataLoaderError::InvalidBatchSize(0))));
    }

    #[test]
    fn rejects_zero_prefetch() {
        let config = DataLoaderConfig { prefetch_count: 0, ..Default::default() };
        assert!(matches!(config.build(), Err(DataLoaderError::InvalidPrefetchCount(0))));
    }

    #[test]
    fn default_builds() {
        let config = DataLoaderConfig::default().build().unwrap();
        assert_eq!(config.shuffle_seed, Some(DEFAULT_SHUFFLE_SEED));
        assert!(config.drop_last);
    }

    #[test]
    fn zero_workers_is_accepted() {
        let config = DataLoaderConfig { num_workers: 0, ..Default::default() };
        assert_eq!(config.build().unwrap().num_workers, 0);
    }
}
