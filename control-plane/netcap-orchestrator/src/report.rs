use netcap_models::{ExecutionSummary, OperationResult, ProbeResult, Verdict};
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::retry::RoundRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Deploy,
    Verify,
    Delete,
    CheckerRun,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Deploy => "deploy",
            Phase::Verify => "verify",
            Phase::Delete => "delete",
            Phase::CheckerRun => "checker_run",
        };
        f.write_str(s)
    }
}

/// Per-item detail carried by a report.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportItems {
    Operations(Vec<OperationResult>),
    Probes(Vec<ProbeResult>),
    None,
}

/// Structured result of one phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub summary: ExecutionSummary,
    pub items: ReportItems,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rounds: Vec<RoundRecord>,
}

impl PhaseReport {
    pub fn operations(
        phase: Phase,
        results: Vec<OperationResult>,
        rounds: Vec<RoundRecord>,
    ) -> Self {
        Self {
            phase,
            summary: ExecutionSummary::from_results(&results),
            items: ReportItems::Operations(results),
            rounds,
        }
    }

    pub fn probes(results: Vec<ProbeResult>) -> Self {
        Self {
            phase: Phase::Verify,
            summary: ExecutionSummary::from_probes(&results),
            items: ReportItems::Probes(results),
            rounds: Vec::new(),
        }
    }

    pub fn counts(phase: Phase, summary: ExecutionSummary) -> Self {
        Self {
            phase,
            summary,
            items: ReportItems::None,
            rounds: Vec::new(),
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.summary.verdict()
    }

    pub fn is_success(&self) -> bool {
        self.verdict().is_success()
    }
}

/// Phase reports of one run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub phases: Vec<PhaseReport>,
}

impl RunReport {
    /// Appends `report` and tells whether the run may continue.
    pub fn push(&mut self, report: PhaseReport) -> bool {
        let ok = report.is_success();
        self.phases.push(report);
        ok
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|r| r.phase == phase)
    }

    /// Failure iff any phase failed.
    pub fn verdict(&self) -> Verdict {
        if self.phases.iter().all(PhaseReport::is_success) {
            Verdict::Success
        } else {
            Verdict::Failure
        }
    }
}

pub fn emit_deploy_summary(summary: &ExecutionSummary) {
    info!(
        event = "deploy_summary",
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        skipped = summary.skipped(),
        total = summary.total()
    );
}

pub fn emit_delete_summary(summary: &ExecutionSummary) {
    info!(
        event = "delete_summary",
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        skipped = summary.skipped(),
        total = summary.total()
    );
}

pub fn emit_probe_summary(summary: &ExecutionSummary) {
    info!(
        event = "summary",
        total = summary.total(),
        passed = summary.passed(),
        failed = summary.failed()
    );
}
