//! Bounded pool for CPU-heavy extraction work.
//!
//! Document parsing and OCR are synchronous and can run for seconds, so
//! they must never occupy a runtime worker thread. Jobs go through
//! `spawn_blocking`, and a semaphore caps how many run at once; callers
//! past the cap wait asynchronously for a permit instead of piling onto
//! the blocking thread pool.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker pool is shut down")]
    Closed,

    #[error("worker task failed: {0}")]
    Join(String),
}

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Run a blocking job on the pool, waiting for a slot if all are busy.
    pub async fn submit<F, T>(&self, job: F) -> Result<T, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        let handle = tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        });

        handle.await.map_err(|e| WorkerError::Join(e.to_string()))
    }

    /// Slots currently free. Mostly useful in tests and logs.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn submit_returns_the_job_result() {
        let pool = WorkerPool::new(2);
        let out = pool.submit(|| 21 * 2).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_cap() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2, "cap was exceeded");
    }

    #[tokio::test]
    async fn permits_are_released_after_completion() {
        let pool = WorkerPool::new(3);
        pool.submit(|| ()).await.unwrap();
        pool.submit(|| ()).await.unwrap();
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test]
    async fn zero_sized_pool_still_makes_progress() {
        // A cap of zero would deadlock; the pool clamps to one.
        let pool = WorkerPool::new(0);
        assert_eq!(pool.submit(|| 7).await.unwrap(), 7);
    }
}
