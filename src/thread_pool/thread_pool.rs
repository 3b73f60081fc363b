use crossbeam_channel::{bounded, unbounded};

use super::worker::{Job, WorkFuture, Worker};

/// Fixed set of worker threads, each with its own FIFO queue.
///
/// Workers hold no state between jobs, so a job's result depends only on
/// what it captured.
pub struct ThreadPool {
    workers: Vec<Worker>,
}

impl ThreadPool {
    pub fn new(size: usize) -> ThreadPool {
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let (sender, receiver) = unbounded();
            workers.push(Worker::new(id, sender, receiver));
        }

        ThreadPool { workers }
    }

    /// Queues `job` on worker `worker_id % size`.
    pub fn submit_work<T, F>(&self, worker_id: usize, job: F) -> WorkFuture<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let worker_id = worker_id % self.workers.len().max(1);
        let (result_sender, receiver) = bounded(1);

        self.send(
            worker_id,
            Box::new(move || {
                // The iterator may already be gone, nothing to report then
                let _ = result_sender.send(job());
            }),
        );

        WorkFuture { worker_id, receiver }
    }

    fn send(&self, worker_id: usize, job: Job) {
        // A failed send drops the job and with it the result sender, which the
        // waiting future observes as a disconnect
        if let Some(sender) = self.workers.get(worker_id).and_then(|w| w.sender.as_ref()) {
            let _ = sender.send(job);
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        for worker in &mut self.workers {
            drop(worker.sender.take());
        }

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::warn!("Worker {} panicked", worker.id);
                }
            }
        }
    }
}
