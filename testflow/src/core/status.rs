//! Stage status as reported to observers and UI consumers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The observable status of a stage or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage's agent step is in flight.
    Running,
    /// The stage produced its artifact.
    Completed,
    /// The stage was below the start stage; its artifact is reused.
    Reused,
    /// The stage was deliberately not invoked.
    Skipped,
    /// The stage failed.
    Failed,
    /// The run stopped gracefully on a provider usage limit.
    Stopped,
    /// The run finished but a best-effort stage failed.
    Degraded,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Reused => write!(f, "reused"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::Stopped => write!(f, "stopped"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Completed.to_string(), "completed");
        assert_eq!(StageStatus::Stopped.to_string(), "stopped");
        assert_eq!(StageStatus::Degraded.to_string(), "degraded");
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::Reused).unwrap();
        assert_eq!(json, r#""reused""#);

        let deserialized: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageStatus::Reused);
    }
}
