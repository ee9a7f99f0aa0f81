//! Bounded worker pool with order-preserving map.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use bandgraph_shared::{BandGraphError, Result};

/// Runs async jobs with at most `size` of them in flight.
///
/// The pool is created explicitly by the caller and must be shut down with
/// [`WorkerPool::shutdown`]; afterwards it rejects new work.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool running up to `size` jobs at once (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    /// Maximum number of concurrent jobs.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Stop accepting work. Jobs waiting for a slot fail with a pool error.
    pub fn shutdown(&self) {
        debug!(size = self.size, "shutting down worker pool");
        self.permits.close();
    }

    /// Whether [`WorkerPool::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.permits.is_closed()
    }

    /// Apply `f` to every item concurrently; `result[i]` is `f(items[i])`.
    ///
    /// Returns the first error in item order and aborts the jobs after it.
    pub async fn map_ordered<T, R, F, Fut>(&self, items: Vec<T>, f: F) -> Result<Vec<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Send + 'static,
    {
        if self.is_shut_down() {
            return Err(BandGraphError::Pool("pool is shut down".into()));
        }

        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let job = f(item);
                let permits = self.permits.clone();
                tokio::spawn(async move {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| BandGraphError::Pool("pool is shut down".into()))?;
                    job.await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut handles = handles.into_iter();
        while let Some(handle) = handles.next() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(BandGraphError::Pool(format!("task failed: {e}"))),
            };
            match outcome {
                Ok(value) => results.push(value),
                Err(e) => {
                    for rest in handles.by_ref() {
                        rest.abort();
                    }
                    return Err(e);
                }
            }
        }

        Ok(results)
    }
}
