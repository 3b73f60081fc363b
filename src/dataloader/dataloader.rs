use std::sync::Arc;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::thread_pool::thread_pool::ThreadPool;

use super::config::DataLoaderConfig;
use super::dataset::Dataset;
use super::error::DataLoaderError;
use super::par_iter::MultithreadedIterator;
use super::sampler::{num_batches, partition, sample_order};

/// Batches a dataset in a seeded order, prefetching on a pool of workers.
pub struct DataLoader<D: Dataset + 'static> {
    dataset: Arc<D>,
    config: DataLoaderConfig,
    thread_pool: Option<Arc<ThreadPool>>,
}

impl<D: Dataset + 'static> DataLoader<D> {
    pub fn new(dataset: D, config: DataLoaderConfig) -> Result<Self, DataLoaderError> {
        let mut config = config.build()?;

        if dataset.is_empty() {
            return Err(DataLoaderError::EmptyDataset);
        }

        // Record a drawn seed so the run can be repeated
        if config.shuffle_seed.is_none() {
            config.shuffle_seed = Some(rand::thread_rng().gen());
            info!("No seed given, using {:?}", config.shuffle_seed);
        }

        let thread_pool = if config.num_workers > 0 {
            Some(Arc::new(ThreadPool::new(config.num_workers)))
        } else {
            None
        };

        Ok(DataLoader {
            dataset: Arc::new(dataset),
            config,
            thread_pool,
        })
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }

    pub fn num_batches(&self) -> usize {
        num_batches(self.len(), self.config.batch_size, self.config.drop_last)
    }

    /// Starts a new pass over the dataset.
    ///
    /// Every call builds a fresh generator from the configured seed, so two
    /// passes with the same seed yield the same batches in the same order.
    pub fn iter(&self) -> MultithreadedIterator<D> {
        let seed = self.config.shuffle_seed.unwrap_or_default();
        let mut rng = StdRng::seed_from_u64(seed);

        let order = sample_order(self.len(), self.config.shuffle.then_some(&mut rng));
        let batches = partition(&order, self.config.batch_size, self.config.drop_last);

        // Drawn after the permutation, as a separate stream for the transforms
        let base_seed: u64 = rng.gen();

        debug!(
            "Starting pass: {} batches of {}, base batch seed {}",
            batches.len(),
            self.config.batch_size,
            base_seed
        );

        MultithreadedIterator::new(
            Arc::clone(&self.dataset),
            self.thread_pool.clone(),
            batches,
            base_seed,
            self.config.prefetch_count,
        )
    }
}
