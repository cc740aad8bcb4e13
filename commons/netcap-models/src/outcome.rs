use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    /// Idempotent no-op: already present on create, already gone on delete.
    #[serde(rename = "SKIPPED")]
    Skipped,
    #[serde(rename = "FAILED")]
    Failed,
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of one lifecycle operation for one target in one round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationResult {
    pub target_id: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl OperationResult {
    pub fn succeeded(target_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self::finish(target_id, Outcome::Succeeded, None, started_at)
    }

    pub fn skipped(target_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self::finish(target_id, Outcome::Skipped, None, started_at)
    }

    pub fn failed(
        target_id: impl Into<String>,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::finish(target_id, Outcome::Failed, Some(error.into()), started_at)
    }

    fn finish(
        target_id: impl Into<String>,
        outcome: Outcome,
        error: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            outcome,
            error,
            started_at,
            finished_at: Utc::now(),
        }
    }
}
