//! The worker pool: an explicitly owned tokio runtime.
//!
//! The calling thread is always one of the workers. With one worker it runs
//! everything itself. With `n > 1` it drives the future passed to
//! [`WorkerPool::block_on`] (normally the accept loop) and `n - 1` scheduler
//! threads run the connection tasks, so the pool never uses more than `n`
//! threads. Dropping the pool stops and joins the scheduler threads.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};

use crate::error::Error;

pub struct WorkerPool {
    runtime: Runtime,
    workers: usize,
}

impl WorkerPool {
    /// `workers == 0` is treated as `1`.
    pub fn new(workers: usize) -> Result<Self, Error> {
        let workers = workers.max(1);
        let runtime = if workers == 1 {
            Builder::new_current_thread().enable_all().build()?
        } else {
            Builder::new_multi_thread()
                .worker_threads(workers - 1)
                .thread_name("wicket-worker")
                .enable_all()
                .build()?
        };
        Ok(Self { runtime, workers })
    }

    /// Threads the pool runs on, the caller of [`block_on`](Self::block_on) included.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Stops the workers, waiting at most `timeout` for running tasks to yield.
    pub fn shutdown(self, timeout: Duration) {
        self.runtime.shutdown_timeout(timeout);
    }
}
