use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::thread_pool::thread_pool::ThreadPool;
use crate::thread_pool::worker::WorkFuture;

use super::data_batch::DataBatch;
use super::dataset::Dataset;
use super::error::DataLoaderError;
use super::sampler::batch_seed;

type BatchResult = Result<DataBatch, DataLoaderError>;

/// Blocking iterator over one pass of batches.
///
/// Batch `i` is loaded by worker `i % workers` with a generator seeded by
/// [`batch_seed`], so random transforms come out the same whatever the worker
/// count or other passes sharing the pool. Up to `max_pending` batches are in
/// flight ahead of the consumer. Without a pool batches load on the caller
/// thread.
pub struct MultithreadedIterator<D: Dataset + 'static> {
    dataset: Arc<D>,
    thread_pool: Option<Arc<ThreadPool>>,
    batches: Vec<Vec<usize>>,
    next_batch: usize,
    next_request: usize,
    pending_futures: VecDeque<WorkFuture<BatchResult>>,
    max_pending: usize,
    base_seed: u64,
}

impl<D: Dataset + 'static> MultithreadedIterator<D> {
    pub(crate) fn new(
        dataset: Arc<D>,
        thread_pool: Option<Arc<ThreadPool>>,
        batches: Vec<Vec<usize>>,
        base_seed: u64,
        max_pending: usize,
    ) -> Self {
        let mut iterator = MultithreadedIterator {
            dataset,
            thread_pool,
            batches,
            next_batch: 0,
            next_request: 0,
            pending_futures: VecDeque::with_capacity(max_pending),
            max_pending,
            base_seed,
        };

        iterator.request_next_batches();

        iterator
    }

    fn request_next_batches(&mut self) {
        let Some(pool) = &self.thread_pool else {
            return;
        };

        while self.pending_futures.len() < self.max_pending && self.next_request < self.batches.len() {
            let batch_number = self.next_request;
            let indices = std::mem::take(&mut self.batches[batch_number]);
            let dataset = Arc::clone(&self.dataset);
            let seed = batch_seed(self.base_seed, batch_number);

            let future = pool.submit_work(batch_number, move || load_batch(&*dataset, batch_number, indices, seed));
            self.pending_futures.push_back(future);
            self.next_request += 1;
        }
    }

    fn wait_for_next_batch(&mut self) -> Option<BatchResult> {
        if self.thread_pool.is_none() {
            let indices = std::mem::take(self.batches.get_mut(self.next_batch)?);
            let seed = batch_seed(self.base_seed, self.next_batch);
            return Some(load_batch(&*self.dataset, self.next_batch, indices, seed));
        }

        let future = self.pending_futures.pop_front()?;
        let worker_id = future.worker_id();
        Some(
            future
                .wait_and_take()
                .unwrap_or(Err(DataLoaderError::WorkerDisconnected(worker_id))),
        )
    }
}

pub(crate) fn load_batch<D: Dataset + ?Sized>(
    dataset: &D,
    batch_number: usize,
    indices: Vec<usize>,
    seed: u64,
) -> BatchResult {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = indices
        .iter()
        .map(|&idx| dataset.get(idx, &mut rng))
        .collect::<Result<Vec<_>, _>>()?;

    DataBatch::from_samples(batch_number, indices, samples)
}

impl<D: Dataset + 'static> Iterator for MultithreadedIterator<D> {
    type Item = BatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.wait_for_next_batch()?;
        self.next_batch += 1;
        self.request_next_batches();
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.batches.len() - self.next_batch;
        (remaining, Some(remaining))
    }
}

impl<D: Dataset + 'static> ExactSizeIterator for MultithreadedIterator<D> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataloader::dataset::Sample;

    struct FailingAt(usize);

    impl Dataset for FailingAt {
        fn len(&self) -> usize {
            6
        }

        fn get(&self, index: usize, _rng: &mut StdRng) -> Result<Sample, DataLoaderError> {
            if index == self.0 {
                return Err(DataLoaderError::Transform(format!("bad sample {}", index)));
            }
            Ok(Sample::new(vec![0.0], [1, 1, 1], index))
        }
    }

    #[test]
    fn a_bad_sample_only_spoils_its_batch() {
        let pool = Arc::new(ThreadPool::new(2));
        let batches = vec![vec![0, 1], vec![2, 3], vec![4, 5]];
        let iter = MultithreadedIterator::new(Arc::new(FailingAt(3)), Some(pool), batches, 0, 2);

        let results: Vec<_> = iter.collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().labels, vec![4, 5]);
    }

    #[test]
    fn reports_exact_length() {
        let batches = vec![vec![0], vec![1], vec![2]];
        let mut iter = MultithreadedIterator::new(Arc::new(FailingAt(99)), None, batches, 0, 1);
        assert_eq!(iter.len(), 3);
        iter.next();
        assert_eq!(iter.len(), 2);
    }
}
