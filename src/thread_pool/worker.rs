use std::thread;

use crossbeam_channel::{Receiver, Sender};
use log::debug;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// One-shot handle to the result of a submitted job.
pub struct WorkFuture<T> {
    pub(crate) worker_id: usize,
    pub(crate) receiver: Receiver<T>,
}

impl<T> WorkFuture<T> {
    /// Blocks until the job finishes. `None` means the worker went away
    /// without producing a result, e.g. the job panicked.
    pub fn wait_and_take(self) -> Option<T> {
        self.receiver.recv().ok()
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }
}

pub struct Worker {
    pub(crate) id: usize,
    pub(crate) sender: Option<Sender<Job>>,
    pub(crate) thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub fn new(id: usize, sender: Sender<Job>, receiver: Receiver<Job>) -> Worker {
        let thread = thread::Builder::new()
            .name(format!("dataloader-{}", id))
            .spawn(move || Self::run(id, receiver))
            .ok();

        Worker {
            id,
            sender: Some(sender),
            thread,
        }
    }

    fn run(id: usize, receiver: Receiver<Job>) {
        // Exits once the pool drops its sender
        for job in receiver.iter() {
            job();
        }

        debug!("Worker {} shutting down", id);
    }
}
