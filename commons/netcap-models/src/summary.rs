use serde::{Deserialize, Serialize};

use crate::outcome::{OperationResult, Outcome};
use crate::probe::ProbeResult;

/// Totals for one phase. Only constructed from a complete result set, so
/// `total == succeeded + failed + skipped` always holds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionSummary {
    total: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
}

impl ExecutionSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a OperationResult>,
    {
        results
            .into_iter()
            .fold(Self::default(), |acc, r| acc.with(r.outcome))
    }

    /// Probe phases have no skipped state; passing probes count as succeeded.
    pub fn from_probes<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ProbeResult>,
    {
        results.into_iter().fold(Self::default(), |acc, r| {
            acc.with(if r.pass {
                Outcome::Succeeded
            } else {
                Outcome::Failed
            })
        })
    }

    /// Summary of a remote execution's task counts.
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        Self {
            total: succeeded + failed,
            succeeded,
            failed,
            skipped: 0,
        }
    }

    fn with(mut self, outcome: Outcome) -> Self {
        self.total += 1;
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
        self
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Alias of `succeeded` used when reporting probe phases.
    pub fn passed(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn verdict(&self) -> Verdict {
        if self.failed > 0 {
            Verdict::Failure
        } else {
            Verdict::Success
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Success)
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Verdict::Success => 0,
            Verdict::Failure => 1,
        }
    }
}
