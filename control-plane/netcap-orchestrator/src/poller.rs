//! Runs the remote checker job and collects its logs.

use netcap_control::{ControlPlane, Execution, LogReader, job_name};
use netcap_models::{EnvVar, ExecutionSummary, JobSpec};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::EngineResult;

pub const CHECKER_JOB_ID: &str = "checker";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub project: String,
    /// `projects/<project>/locations/<region>`
    pub parent: String,
    /// Time given to the logging backend to ingest the run's entries.
    pub log_ingestion_delay: Duration,
}

impl PollerConfig {
    pub fn job_name(&self) -> String {
        job_name(&self.parent, CHECKER_JOB_ID)
    }
}

/// Environment handed to the checker container.
pub fn checker_env(
    project: &str,
    region: &str,
    prefix: &str,
    concurrency: usize,
) -> Vec<EnvVar> {
    vec![
        EnvVar::new("PROJECT_ID", project),
        EnvVar::new("REGION", region),
        EnvVar::new("PREFIX", prefix),
        EnvVar::new("CONCURRENCY", concurrency.to_string()),
    ]
}

/// Log filter selecting one execution of the checker job.
pub fn execution_log_filter(execution_short_name: &str) -> String {
    format!(
        "resource.type=\"cloud_run_job\" AND \
         resource.labels.job_name=\"{}\" AND \
         labels.\"run.googleapis.com/execution_name\"=\"{}\"",
        CHECKER_JOB_ID, execution_short_name
    )
}

#[derive(Debug, Clone)]
pub struct CheckerRun {
    pub execution: Execution,
    /// Log lines re-emitted on the output sink.
    pub log_lines: usize,
    pub log_error: Option<String>,
}

impl CheckerRun {
    /// Failure iff any task of the execution failed or was cancelled.
    pub fn summary(&self) -> ExecutionSummary {
        let failed = self.execution.failed_count + self.execution.cancelled_count;
        ExecutionSummary::from_counts(
            self.execution.succeeded_count as usize,
            failed as usize,
        )
    }
}

pub struct ExecutionPoller {
    control: Arc<dyn ControlPlane>,
    logs: Arc<dyn LogReader>,
    config: PollerConfig,
    sink: Box<dyn Fn(&str) + Send + Sync>,
}

impl ExecutionPoller {
    pub fn new(
        control: Arc<dyn ControlPlane>,
        logs: Arc<dyn LogReader>,
        config: PollerConfig,
    ) -> Self {
        Self {
            control,
            logs,
            config,
            sink: Box::new(|line: &str| {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{}", line);
            }),
        }
    }

    /// Replaces stdout as the destination of re-emitted log lines.
    pub fn with_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Creates the checker job, or updates it in place when it exists.
    pub async fn ensure_checker_job(&self, spec: &JobSpec) -> EngineResult<()> {
        let name = self.config.job_name();
        match self
            .control
            .create_job(&self.config.parent, CHECKER_JOB_ID, spec)
            .await
        {
            Ok(op) => {
                self.control.wait_operation(&op).await?;
                info!(event = "checker_job_created", job = %name);
            }
            Err(e) if e.is_already_exists() => {
                info!(event = "checker_job_exists", job = %name);
                let op = self.control.update_job(&name, spec).await?;
                self.control.wait_operation(&op).await?;
                info!(event = "checker_job_updated", job = %name);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Runs the job, blocks until the execution is terminal, then reads its
    /// logs. Log retrieval is best effort and never changes the result.
    pub async fn run_and_wait(&self) -> EngineResult<CheckerRun> {
        let name = self.config.job_name();
        info!(event = "checker_run_start", job = %name);
        let op = self.control.run_job(&name).await?;
        let execution = self.control.wait_operation(&op).await?.into_execution()?;
        info!(
            event = "checker_run_complete",
            execution = %execution.name,
            succeeded_count = execution.succeeded_count,
            failed_count = execution.failed_count,
            cancelled_count = execution.cancelled_count
        );

        let (log_lines, log_error) = match self.read_logs(&execution).await {
            Ok(n) => (n, None),
            Err(e) => {
                warn!(event = "log_read_failed", error = %e);
                (0, Some(e.to_string()))
            }
        };
        Ok(CheckerRun {
            execution,
            log_lines,
            log_error,
        })
    }

    async fn read_logs(&self, execution: &Execution) -> EngineResult<usize> {
        info!(
            event = "waiting_for_logs",
            seconds = self.config.log_ingestion_delay.as_secs()
        );
        tokio::time::sleep(self.config.log_ingestion_delay).await;

        let filter = execution_log_filter(execution.short_name());
        info!(event = "reading_logs", filter = %filter);
        let entries = self
            .logs
            .read_entries(&self.config.project, &filter)
            .await?;
        let mut count = 0;
        for entry in &entries {
            let line = entry.payload_line();
            if line.is_empty() {
                continue;
            }
            (self.sink)(&line);
            count += 1;
        }
        info!(event = "logs_read", count);
        Ok(count)
    }

    /// Deletes the checker job; an absent job is not an error.
    pub async fn delete_checker_job(&self) -> EngineResult<()> {
        let name = self.config.job_name();
        info!(event = "delete_checker_job", job = %name);
        match self.control.delete_job(&name).await {
            Ok(op) => {
                self.control.wait_operation(&op).await?;
                info!(event = "checker_job_deleted", job = %name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(event = "checker_job_not_found", job = %name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
