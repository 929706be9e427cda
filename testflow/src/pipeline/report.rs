//! The result of a pipeline run.

use serde::Serialize;

use super::policy::FailureRecord;
use crate::core::{ArtifactChecklist, ExecutionStage, StageStatus};

/// How a run that did not raise ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every unresolved stage produced its artifact or was skipped by rule.
    Completed,
    /// A best-effort stage failed and was tolerated.
    Degraded {
        /// The tolerated failures.
        failures: Vec<FailureRecord>,
    },
    /// The provider throttled the agent; resume later.
    Stopped {
        /// The stage that was throttled.
        stage: ExecutionStage,
        /// The classified error.
        reason: String,
    },
}

impl RunOutcome {
    /// The status reported to observers.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Completed => StageStatus::Completed,
            Self::Degraded { .. } => StageStatus::Degraded,
            Self::Stopped { .. } => StageStatus::Stopped,
        }
    }

    /// Returns true for a clean completion.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Everything a caller learns from a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Artifact presence after the run.
    pub artifacts: ArtifactChecklist,
    /// Stages whose agent step was invoked, in order.
    pub invoked: Vec<ExecutionStage>,
}
