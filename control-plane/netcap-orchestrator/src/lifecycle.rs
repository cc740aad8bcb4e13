//! Idempotent bulk create and delete over the control plane.
//!
//! Every batch runs in two phases: all submissions go out through the
//! executor, then all returned operations are waited on. Duplicate creation
//! and deletion of an absent service settle as `Skipped`.

use chrono::{DateTime, Utc};
use netcap_control::{ControlPlane, ControlPlaneError, ErrorKind, Operation};
use netcap_models::{DiscoveredResource, OperationResult, Target};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::{EngineError, EngineResult};
use crate::executor::{BoundedExecutor, TaskError};

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// `projects/<project>/locations/<region>`
    pub parent: String,
    pub batch_size: usize,
    pub concurrency: usize,
    pub submit_delay: Duration,
}

/// Anything the lifecycle engine can address by a stable id.
pub trait LifecycleItem: Clone + Send + Sync + 'static {
    fn item_id(&self) -> &str;
}

impl LifecycleItem for Target {
    fn item_id(&self) -> &str {
        &self.id
    }
}

impl LifecycleItem for DiscoveredResource {
    fn item_id(&self) -> &str {
        &self.short_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Delete,
}

impl Action {
    /// Status class that makes this action a no-op.
    fn idempotent_kind(self) -> ErrorKind {
        match self {
            Action::Create => ErrorKind::AlreadyExists,
            Action::Delete => ErrorKind::NotFound,
        }
    }

    fn skipped_event(self) -> &'static str {
        match self {
            Action::Create => "service_already_exists",
            Action::Delete => "service_not_found",
        }
    }

    fn submit_failed_event(self) -> &'static str {
        match self {
            Action::Create => "create_service_failed",
            Action::Delete => "delete_service_failed",
        }
    }

    fn wait_failed_event(self) -> &'static str {
        match self {
            Action::Create => "service_deploy_failed",
            Action::Delete => "service_delete_failed",
        }
    }

    fn done_event(self) -> &'static str {
        match self {
            Action::Create => "service_deployed",
            Action::Delete => "service_deleted",
        }
    }
}

/// Per-target state between submission and completion wait.
#[derive(Debug, Clone)]
pub enum Submission {
    Pending {
        target_id: String,
        operation: Operation,
        started_at: DateTime<Utc>,
    },
    Settled(OperationResult),
}

/// Ordered submissions of one batch, awaiting completion.
#[derive(Debug, Clone)]
pub struct SubmittedBatch {
    action: Action,
    entries: Vec<Submission>,
}

impl SubmittedBatch {
    pub fn action(&self) -> Action {
        self.action
    }

    pub fn entries(&self) -> &[Submission] {
        &self.entries
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, Submission::Pending { .. }))
            .count()
    }
}

type Attempt<T> =
    Result<(DateTime<Utc>, T), (DateTime<Utc>, ControlPlaneError)>;

type SubmitSlot =
    Result<(DateTime<Utc>, Operation), TaskError<(DateTime<Utc>, ControlPlaneError)>>;

fn timed<T>(
    started_at: DateTime<Utc>,
    result: Result<T, ControlPlaneError>,
) -> Attempt<T> {
    result.map(|v| (started_at, v)).map_err(|e| (started_at, e))
}

pub struct LifecycleOrchestrator {
    control: Arc<dyn ControlPlane>,
    config: LifecycleConfig,
    submitter: BoundedExecutor,
    waiter: BoundedExecutor,
}

impl LifecycleOrchestrator {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        config: LifecycleConfig,
    ) -> EngineResult<Self> {
        if config.batch_size == 0 {
            return Err(EngineError::InvalidArgument(
                "batch size must be at least 1".into(),
            ));
        }
        let waiter = BoundedExecutor::new(config.concurrency)?;
        let submitter =
            waiter.clone().with_submit_delay(config.submit_delay);
        Ok(Self {
            control,
            config,
            submitter,
            waiter,
        })
    }

    /// Stops new submissions once `token` fires. Operations already
    /// submitted are still waited on.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.submitter = self.submitter.with_cancellation(token);
        self
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub async fn create(&self, targets: &[Target]) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(targets.len());
        for batch in targets.chunks(self.config.batch_size) {
            let submitted = self.submit_create(batch).await;
            results.extend(self.wait(submitted).await);
        }
        results
    }

    pub async fn delete(
        &self,
        resources: &[DiscoveredResource],
    ) -> Vec<OperationResult> {
        let mut results = Vec::with_capacity(resources.len());
        for batch in resources.chunks(self.config.batch_size) {
            let submitted = self.submit_delete(batch).await;
            results.extend(self.wait(submitted).await);
        }
        results
    }

    pub async fn submit_create(&self, batch: &[Target]) -> SubmittedBatch {
        let parent = self.config.parent.clone();
        self.submit(Action::Create, batch, move |control, target: Target| {
            let parent = parent.clone();
            async move {
                control
                    .create_service(&parent, &target.id, &target.spec)
                    .await
            }
        })
        .await
    }

    pub async fn submit_delete(
        &self,
        batch: &[DiscoveredResource],
    ) -> SubmittedBatch {
        self.submit(
            Action::Delete,
            batch,
            |control, resource: DiscoveredResource| async move {
                control.delete_service(&resource.name).await
            },
        )
        .await
    }

    async fn submit<I, F, Fut>(
        &self,
        action: Action,
        batch: &[I],
        call: F,
    ) -> SubmittedBatch
    where
        I: LifecycleItem,
        F: Fn(Arc<dyn ControlPlane>, I) -> Fut,
        Fut: Future<Output = Result<Operation, ControlPlaneError>>
            + Send
            + 'static,
    {
        let batch_started = Utc::now();
        let attempts = self
            .submitter
            .run(batch.to_vec(), |item| {
                let fut = call(self.control.clone(), item);
                async move {
                    let started_at = Utc::now();
                    timed(started_at, fut.await)
                }
            })
            .await;

        let entries = batch
            .iter()
            .zip(attempts)
            .map(|(item, attempt)| {
                classify_submission(
                    action,
                    item.item_id(),
                    attempt,
                    batch_started,
                )
            })
            .collect();
        SubmittedBatch { action, entries }
    }

    /// Waits on every pending operation of `batch`, preserving its order.
    pub async fn wait(&self, batch: SubmittedBatch) -> Vec<OperationResult> {
        let action = batch.action;
        let ids: Vec<String> = batch
            .entries
            .iter()
            .map(|e| e.target_id().to_string())
            .collect();
        let batch_started = Utc::now();
        let control = self.control.clone();
        let settled = self
            .waiter
            .run(batch.entries, move |entry| {
                let control = control.clone();
                async move {
                    let result = match entry {
                        Submission::Settled(result) => result,
                        Submission::Pending {
                            target_id,
                            operation,
                            started_at,
                        } => {
                            await_completion(
                                control.as_ref(),
                                action,
                                target_id,
                                operation,
                                started_at,
                            )
                            .await
                        }
                    };
                    Ok::<_, Infallible>(result)
                }
            })
            .await;

        settled
            .into_iter()
            .zip(ids)
            .map(|(r, id)| match r {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        event = action.wait_failed_event(),
                        service = %id,
                        error = %e
                    );
                    OperationResult::failed(id, e.to_string(), batch_started)
                }
            })
            .collect()
    }
}

impl Submission {
    pub fn target_id(&self) -> &str {
        match self {
            Submission::Pending { target_id, .. } => target_id,
            Submission::Settled(result) => &result.target_id,
        }
    }
}

async fn await_completion(
    control: &dyn ControlPlane,
    action: Action,
    target_id: String,
    operation: Operation,
    started_at: DateTime<Utc>,
) -> OperationResult {
    match control.wait_operation(&operation).await {
        Ok(_) => {
            info!(event = action.done_event(), service = %target_id);
            OperationResult::succeeded(target_id, started_at)
        }
        Err(e) => {
            error!(
                event = action.wait_failed_event(),
                service = %target_id,
                error = %e
            );
            OperationResult::failed(target_id, e.to_string(), started_at)
        }
    }
}

fn classify_submission(
    action: Action,
    target_id: &str,
    attempt: SubmitSlot,
    batch_started: DateTime<Utc>,
) -> Submission {
    let (started_at, err) = match attempt {
        Ok((started_at, operation)) => {
            return Submission::Pending {
                target_id: target_id.to_string(),
                operation,
                started_at,
            };
        }
        Err(TaskError::Operation((started_at, e))) => {
            if e.kind() == action.idempotent_kind() {
                info!(event = action.skipped_event(), service = %target_id);
                return Submission::Settled(OperationResult::skipped(
                    target_id, started_at,
                ));
            }
            (started_at, e.to_string())
        }
        Err(TaskError::Panicked(message)) => {
            (batch_started, format!("task panicked: {}", message))
        }
        Err(TaskError::Cancelled) => {
            (batch_started, "cancelled before start".to_string())
        }
    };
    error!(
        event = action.submit_failed_event(),
        service = %target_id,
        error = %err
    );
    Submission::Settled(OperationResult::failed(target_id, err, started_at))
}
