//! Round-based resubmission of failed targets.

use chrono::Utc;
use netcap_models::{ExecutionSummary, OperationResult};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::lifecycle::LifecycleItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Rounds allowed after the initial one.
    pub max_retry_rounds: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_rounds: 3,
            backoff: Duration::from_secs(30),
        }
    }
}

/// What one round submitted and which of those ids failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    pub round: u32,
    pub submitted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RetryOutcome {
    /// Final result per item, in input order.
    pub results: Vec<OperationResult>,
    pub rounds: Vec<RoundRecord>,
}

impl RetryOutcome {
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary::from_results(&self.results)
    }

    /// Rounds after the first.
    pub fn retry_rounds(&self) -> &[RoundRecord] {
        self.rounds.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct RetryController {
    policy: RetryPolicy,
    cancel: Option<CancellationToken>,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    /// No further rounds start once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `attempt` over all items, then over the failed subset of each
    /// round until nothing fails or the round cap is reached. `attempt` must
    /// return one result per input item, in input order.
    pub async fn run<T, F, Fut>(&self, items: &[T], mut attempt: F) -> RetryOutcome
    where
        T: LifecycleItem,
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Vec<OperationResult>>,
    {
        let mut slots: Vec<Option<OperationResult>> = vec![None; items.len()];
        let mut rounds = Vec::new();
        let mut pending: Vec<usize> = (0..items.len()).collect();
        let mut round = 0u32;

        while !pending.is_empty() {
            let batch: Vec<T> = pending.iter().map(|&i| items[i].clone()).collect();
            let results = attempt(batch).await;

            let mut failed = Vec::new();
            for (&index, result) in pending.iter().zip(results) {
                if result.outcome.is_failed() {
                    failed.push(index);
                }
                slots[index] = Some(result);
            }
            let record = RoundRecord {
                round,
                submitted: ids(items, &pending),
                failed: ids(items, &failed),
            };
            info!(
                event = "round_complete",
                round,
                submitted = record.submitted.len(),
                failed = record.failed.len()
            );
            rounds.push(record);

            if failed.is_empty() {
                break;
            }
            if round >= self.policy.max_retry_rounds {
                warn!(
                    event = "retry_exhausted",
                    rounds = round,
                    failed = failed.len()
                );
                break;
            }
            if !self.backoff().await {
                warn!(event = "retry_cancelled", failed = failed.len());
                break;
            }
            round += 1;
            info!(event = "retry_round_start", round, count = failed.len());
            pending = failed;
        }

        let results = slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| {
                slot.unwrap_or_else(|| {
                    OperationResult::failed(
                        item.item_id(),
                        "no result recorded",
                        Utc::now(),
                    )
                })
            })
            .collect();
        RetryOutcome { results, rounds }
    }

    /// Sleeps for the backoff; false when cancelled meanwhile.
    async fn backoff(&self) -> bool {
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(self.policy.backoff) => true,
            },
            None => {
                tokio::time::sleep(self.policy.backoff).await;
                true
            }
        }
    }
}

fn ids<T: LifecycleItem>(items: &[T], indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&i| items[i].item_id().to_string())
        .collect()
}
