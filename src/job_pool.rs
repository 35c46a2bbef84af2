//! Bounded concurrency gate for external commands.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// At most `limit` submitted jobs make progress at once; the rest wait
/// their turn in FIFO order. There are no priorities and no cancellation.
///
/// The engine sizes this at `host_cpu_count + 1` so there is always one
/// queued command ready the moment a core frees up.
///
#[derive(Debug)]
pub struct JobPool {
    permits: Arc<Semaphore>,
}

impl JobPool {
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Run `job` once a slot is free. The caller suspends until the job
    /// has both acquired a slot and finished; errors surface through the
    /// job's own output type and never poison the pool.
    pub async fn submit<F, T>(&self, job: F) -> T
    where
        F: Future<Output = T>,
    {
        let _slot = self
            .permits
            .acquire()
            .await
            .expect("job pool semaphore closed");
        job.await
    }
}
