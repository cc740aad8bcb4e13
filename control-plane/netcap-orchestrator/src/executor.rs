//! Bounded fan-out over independent operations.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::errors::{EngineError, EngineResult};

/// Why a slot has no operation result.
#[derive(Error, Debug)]
pub enum TaskError<E> {
    #[error("{0}")]
    Operation(E),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("cancelled before start")]
    Cancelled,
}

impl<E> TaskError<E> {
    fn from_join(err: JoinError) -> Self {
        if !err.is_panic() {
            return TaskError::Cancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        TaskError::Panicked(message)
    }
}

enum Slot<R, E> {
    Running(JoinHandle<Result<R, E>>),
    Cancelled,
}

/// Runs one operation per item with at most `concurrency` in flight and
/// returns results aligned with the input.
///
/// Operations never observe each other: an error or panic is recorded in its
/// own slot and siblings keep running.
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    concurrency: usize,
    submit_delay: Duration,
    cancel: Option<CancellationToken>,
}

impl BoundedExecutor {
    pub fn new(concurrency: usize) -> EngineResult<Self> {
        if concurrency == 0 {
            return Err(EngineError::InvalidArgument(
                "concurrency must be at least 1".into(),
            ));
        }
        Ok(Self {
            concurrency,
            submit_delay: Duration::ZERO,
            cancel: None,
        })
    }

    /// Pause between successive starts. Only submission is serialised.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Items not yet started when `token` fires resolve to
    /// [`TaskError::Cancelled`]; started ones run to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run<T, R, E, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
    ) -> Vec<Result<R, TaskError<E>>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut slots: Vec<Slot<R, E>> = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            if index > 0 && !self.submit_delay.is_zero() {
                self.pause(self.submit_delay).await;
            }
            let Some(permit) = self.acquire(&semaphore).await else {
                slots.push(Slot::Cancelled);
                continue;
            };
            let fut = op(item);
            slots.push(Slot::Running(tokio::spawn(async move {
                let _permit = permit;
                fut.await
            })));
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            results.push(match slot {
                Slot::Cancelled => Err(TaskError::Cancelled),
                Slot::Running(handle) => match handle.await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(TaskError::Operation(e)),
                    Err(join) => Err(TaskError::from_join(join)),
                },
            });
        }
        results
    }

    async fn acquire(
        &self,
        semaphore: &Arc<Semaphore>,
    ) -> Option<OwnedSemaphorePermit> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            },
            None => semaphore.clone().acquire_owned().await.ok(),
        }
    }

    async fn pause(&self, delay: Duration) {
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(matches!(
            BoundedExecutor::new(0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn panic_is_isolated_to_its_slot() {
        let exec = BoundedExecutor::new(2).unwrap();
        let results = exec
            .run(vec![1u32, 2, 3], |n| async move {
                if n == 2 {
                    panic!("boom");
                }
                Ok::<_, String>(n * 10)
            })
            .await;
        assert_eq!(results[0].as_ref().ok(), Some(&10));
        assert!(matches!(&results[1], Err(TaskError::Panicked(m)) if m == "boom"));
        assert_eq!(results[2].as_ref().ok(), Some(&30));
    }
}
