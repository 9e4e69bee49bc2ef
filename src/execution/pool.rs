//! Bounded worker pools.
//!
//! Both backends honour the same contract: `submit` hands a job to the pool and
//! returns a future for its value; at most `max_workers` jobs run at once; a job
//! that panics resolves to `TaskFailure::Panicked` instead of tearing down the
//! pool or its siblings.

use crate::error::{ExecutionError, TaskFailure};
use crate::execution::options::PoolBackend;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};

pub(crate) enum WorkerPool {
    Threads { permits: Arc<Semaphore> },
    Compute { pool: Arc<rayon::ThreadPool> },
}

impl WorkerPool {
    pub(crate) fn new(backend: PoolBackend, max_workers: usize) -> Result<Self, ExecutionError> {
        let max_workers = max_workers.max(1);
        match backend {
            PoolBackend::Threads => Ok(WorkerPool::Threads {
                permits: Arc::new(Semaphore::new(max_workers)),
            }),
            PoolBackend::Compute => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(max_workers)
                    .thread_name(|i| format!("strata-compute-{i}"))
                    .build()
                    .map_err(|e| ExecutionError::Pool(format!("Failed to build compute pool: {}", e)))?;
                Ok(WorkerPool::Compute {
                    pool: Arc::new(pool),
                })
            }
        }
    }

    /// Queue `job` and return a future resolving to its value.
    ///
    /// With a `timeout`, the deadline counts from the moment the job starts
    /// running, not from submission; an overdue job resolves to
    /// `TaskFailure::TimedOut` while its thread runs on to completion.
    /// Must be called from within a tokio runtime.
    pub(crate) fn submit<T, F>(
        &self,
        job: F,
        timeout: Option<Duration>,
    ) -> BoxFuture<'static, Result<T, TaskFailure>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match self {
            WorkerPool::Threads { permits } => {
                let permits = Arc::clone(permits);
                async move {
                    let permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| TaskFailure::PoolClosed)?;
                    // The permit travels with the job so it is only released when
                    // the job really finishes, even if the caller stopped waiting.
                    let handle = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        job()
                    });
                    let joined = with_deadline(timeout, handle).await?;
                    match joined {
                        Ok(value) => Ok(value),
                        Err(err) if err.is_panic() => {
                            Err(TaskFailure::Panicked(panic_message(err.into_panic().as_ref())))
                        }
                        Err(_) => Err(TaskFailure::PoolClosed),
                    }
                }
                .boxed()
            }
            WorkerPool::Compute { pool } => {
                let (started_tx, started_rx) = oneshot::channel::<()>();
                let (done_tx, done_rx) = oneshot::channel();
                pool.spawn(move || {
                    let _ = started_tx.send(());
                    let outcome = catch_unwind(AssertUnwindSafe(job));
                    let _ = done_tx.send(outcome);
                });
                async move {
                    started_rx.await.map_err(|_| TaskFailure::PoolClosed)?;
                    match with_deadline(timeout, done_rx).await? {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(payload)) => Err(TaskFailure::Panicked(panic_message(payload.as_ref()))),
                        Err(_) => Err(TaskFailure::PoolClosed),
                    }
                }
                .boxed()
            }
        }
    }
}

async fn with_deadline<F: Future>(
    timeout: Option<Duration>,
    future: F,
) -> Result<F::Output, TaskFailure> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| TaskFailure::TimedOut(limit.as_millis() as u64)),
        None => Ok(future.await),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
