//! Top-level run modes: deploy then verify, verify only, and cleanup.

use netcap_control::{ControlPlane, LogReader};
use netcap_models::{DiscoveredResource, Target};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{RunConfig, RunMode, VerifyMode};
use crate::discovery::discover;
use crate::errors::{EngineError, EngineResult};
use crate::lifecycle::LifecycleOrchestrator;
use crate::poller::ExecutionPoller;
use crate::prober::Prober;
use crate::report::{
    Phase, PhaseReport, RunReport, emit_delete_summary, emit_deploy_summary,
    emit_probe_summary,
};
use crate::retry::RetryController;
use crate::targets::generate_targets;

/// Discovers the run's services and probes each of them.
///
/// Shared by local verification and the checker binary. A listing failure
/// or an empty match set is an error.
pub async fn verify_services(
    control: &dyn ControlPlane,
    parent: &str,
    prefix: &str,
    prober: &Prober,
) -> EngineResult<PhaseReport> {
    let services = match discover(control, parent, prefix).await {
        Ok(s) => s,
        Err(e) => {
            error!(event = "list_services_failed", error = %e);
            return Err(e);
        }
    };
    if services.is_empty() {
        error!(
            event = "no_services",
            message = %format!("no services found with prefix {:?}", prefix)
        );
        return Err(EngineError::NoServices(prefix.to_string()));
    }
    info!(event = "services_found", count = services.len());

    let report = PhaseReport::probes(prober.probe_all(&services).await);
    emit_probe_summary(&report.summary);
    Ok(report)
}

pub struct Runner<'a> {
    config: &'a RunConfig,
    control: Arc<dyn ControlPlane>,
    poller: ExecutionPoller,
    cancel: CancellationToken,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: &'a RunConfig,
        control: Arc<dyn ControlPlane>,
        logs: Arc<dyn LogReader>,
    ) -> Self {
        let poller = ExecutionPoller::new(control.clone(), logs, config.poller());
        Self {
            config,
            control,
            poller,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replaces stdout as the sink for the checker's re-emitted log lines.
    pub fn with_log_sink(
        mut self,
        sink: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.poller = self.poller.with_sink(sink);
        self
    }

    pub async fn run(&self) -> EngineResult<RunReport> {
        let mut report = RunReport::default();
        match self.config.mode {
            RunMode::Deploy => {
                let deploy = self.deploy().await?;
                let ok = report.push(deploy);
                if ok {
                    report.push(self.verify().await?);
                }
            }
            RunMode::VerifyOnly => {
                report.push(self.verify().await?);
            }
            RunMode::Cleanup => {
                let delete = self.delete().await?;
                let ok = report.push(delete);
                if ok {
                    self.poller.delete_checker_job().await?;
                }
            }
        }
        Ok(report)
    }

    fn orchestrator(&self) -> EngineResult<LifecycleOrchestrator> {
        Ok(LifecycleOrchestrator::new(
            self.control.clone(),
            self.config.lifecycle(),
        )?
        .with_cancellation(self.cancel.clone()))
    }

    fn retry(&self) -> RetryController {
        RetryController::new(self.config.retry)
            .with_cancellation(self.cancel.clone())
    }

    /// Creates every target, retrying failures.
    pub async fn deploy(&self) -> EngineResult<PhaseReport> {
        let template = self.config.service_template()?;
        let targets =
            generate_targets(&self.config.prefix, self.config.count, &template)?;
        info!(event = "deploy_start", count = targets.len());

        let orchestrator = self.orchestrator()?;
        let orchestrator = &orchestrator;
        let outcome = self
            .retry()
            .run(&targets, |batch: Vec<Target>| async move {
                orchestrator.create(&batch).await
            })
            .await;

        let report =
            PhaseReport::operations(Phase::Deploy, outcome.results, outcome.rounds);
        emit_deploy_summary(&report.summary);
        Ok(report)
    }

    /// Deletes every discovered service of this run, retrying failures.
    pub async fn delete(&self) -> EngineResult<PhaseReport> {
        let resources = discover(
            self.control.as_ref(),
            &self.config.parent(),
            &self.config.prefix,
        )
        .await?;
        info!(event = "delete_start", count = resources.len());

        let orchestrator = self.orchestrator()?;
        let orchestrator = &orchestrator;
        let outcome = self
            .retry()
            .run(&resources, |batch: Vec<DiscoveredResource>| async move {
                orchestrator.delete(&batch).await
            })
            .await;

        let report =
            PhaseReport::operations(Phase::Delete, outcome.results, outcome.rounds);
        emit_delete_summary(&report.summary);
        Ok(report)
    }

    /// Verifies reachability either through the checker job or in-process.
    pub async fn verify(&self) -> EngineResult<PhaseReport> {
        match self.config.verify_mode {
            VerifyMode::Remote => {
                let spec = self.config.checker_job()?;
                self.poller.ensure_checker_job(&spec).await?;
                let run = self.poller.run_and_wait().await?;
                Ok(PhaseReport::counts(Phase::CheckerRun, run.summary()))
            }
            VerifyMode::Local => {
                let prober = Prober::new(self.config.probe())?
                    .with_cancellation(self.cancel.clone());
                verify_services(
                    self.control.as_ref(),
                    &self.config.parent(),
                    &self.config.prefix,
                    &prober,
                )
                .await
            }
        }
    }
}
