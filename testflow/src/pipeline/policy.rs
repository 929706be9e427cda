//! What happens when a stage fails.
//!
//! Throttling always stops the run gracefully. Otherwise stages 1-3 are
//! mandatory and abort the run, while stages 4-5 are best-effort and are
//! governed by [`BestEffortPolicy`].

use serde::{Deserialize, Serialize};

use crate::core::ExecutionStage;
use crate::events::FailureDisposition;
use crate::utils::iso_timestamp;

/// Handling of a non-throttling failure in a best-effort stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestEffortPolicy {
    /// Continue to the summary without the stage's artifact and report the
    /// run as degraded.
    #[default]
    Tolerate,
    /// Abort with a `DegradedStageFailure` error.
    Escalate,
}

impl BestEffortPolicy {
    /// Returns true if best-effort failures abort the run.
    #[must_use]
    pub const fn escalates(self) -> bool {
        matches!(self, Self::Escalate)
    }
}

/// Decides how a failure of `stage` is handled.
#[must_use]
pub const fn disposition(stage: ExecutionStage, is_usage_limit: bool) -> FailureDisposition {
    if is_usage_limit {
        FailureDisposition::UsageLimit
    } else if stage.is_mandatory() {
        FailureDisposition::Fatal
    } else {
        FailureDisposition::Degraded
    }
}

/// Record of a tolerated best-effort failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// The stage that failed.
    pub stage: ExecutionStage,
    /// Rendered error, including its context chain.
    pub error: String,
    /// When the failure was recorded (ISO 8601).
    pub timestamp: String,
}

impl FailureRecord {
    /// Creates a failure record stamped with the current time.
    #[must_use]
    pub fn new(stage: ExecutionStage, error: impl Into<String>) -> Self {
        Self {
            stage,
            error: error.into(),
            timestamp: iso_timestamp(),
        }
    }
}
