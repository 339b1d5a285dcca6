//! Bounded worker pool for store operations
//!
//! Every store call is submitted as one unit of work. A unit waits for one of
//! `workers` permits, then runs on the tokio runtime raced against the
//! per-call timeout and the executor's cancellation token. The returned
//! [`TaskHandle`] is itself a future.
//!
//! Chaining happens in the caller's task through [`ComposeExt::compose`] and
//! [`join_all`], so a running unit never waits on another unit's result.

use futures::future::{self, FutureExt, Then};
use kvt_common::config::ExecutorConfig;
use kvt_common::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bounded pool that runs store operations off the caller's context
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    permits: Arc<Semaphore>,
    workers: usize,
    call_timeout: Duration,
    cancel: CancellationToken,
}

impl TaskExecutor {
    /// Create an executor with `workers` concurrent slots (minimum 1)
    pub fn new(workers: usize, call_timeout: Duration) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            call_timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(
            config.workers,
            Duration::from_millis(config.call_timeout_ms),
        )
    }

    /// Tie this executor to an outer cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel queued and running units
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Submit one unit of work
    ///
    /// The unit fails with [`Error::Storage`] when it outlives the call
    /// timeout and with [`Error::Cancelled`] when the executor is cancelled
    /// before or while it runs. Dropping the handle does not stop the unit.
    pub fn submit<T, F>(&self, operation: &'static str, work: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.clone();
        let call_timeout = self.call_timeout;

        let handle = tokio::spawn(async move {
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(Error::Cancelled(format!("{} cancelled before start", operation)));
                }
                permit = permits.acquire_owned() => permit.map_err(|_| {
                    Error::Cancelled(format!("{}: executor closed", operation))
                })?,
            };

            debug!(operation, "Running store operation");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Err(Error::Cancelled(format!("{} cancelled while running", operation)))
                }
                outcome = tokio::time::timeout(call_timeout, work) => match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            operation,
                            timeout_ms = call_timeout.as_millis() as u64,
                            "Store operation timed out"
                        );
                        Err(Error::Storage(format!(
                            "{} timed out after {} ms",
                            operation,
                            call_timeout.as_millis()
                        )))
                    }
                },
            }
        });

        TaskHandle { operation, handle }
    }
}

/// Future completing with the result of a submitted unit
pub struct TaskHandle<T> {
    operation: &'static str,
    handle: JoinHandle<Result<T>>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(Error::Internal(format!(
                "{} task failed: {}",
                operation, join_err
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Sequential chaining of fallible futures
///
/// The continuation receives the predecessor's `Result`, error included.
pub trait ComposeExt<T>: Future<Output = Result<T>> + Sized {
    fn compose<U, F, Fut>(self, next: F) -> Then<Self, Fut, F>
    where
        F: FnOnce(Result<T>) -> Fut,
        Fut: Future<Output = Result<U>>,
    {
        self.then(next)
    }
}

impl<T, F> ComposeExt<T> for F where F: Future<Output = Result<T>> {}

/// Wait for every future; results keep input order, first failure wins
pub async fn join_all<I, F, T>(futures: I) -> Result<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T>>,
{
    future::try_join_all(futures).await
}
