//! Typed progress records emitted by the pipeline controller.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::core::{ArtifactChecklist, ExecutionStage, StageStatus};

/// Coarse category of a record, used to pick a display role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// General progress information.
    Info,
    /// The agent invoked a tool.
    ToolInvocation,
    /// A stage boundary.
    StepTransition,
}

/// How the controller handled a stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureDisposition {
    /// Provider throttling; the run stops gracefully.
    UsageLimit,
    /// A mandatory stage failed; the run aborts.
    Fatal,
    /// A best-effort stage failed; the run continues without its artifact.
    Degraded,
}

impl fmt::Display for FailureDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsageLimit => write!(f, "usage_limit"),
            Self::Fatal => write!(f, "fatal"),
            Self::Degraded => write!(f, "degraded"),
        }
    }
}

/// One step of progress reported by a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressRecord {
    /// The run began.
    RunStarted {
        /// First stage that will be invoked.
        start: ExecutionStage,
        /// The working directory.
        work_dir: PathBuf,
    },
    /// A stage's agent step is about to be invoked.
    StageStarted {
        /// The stage.
        stage: ExecutionStage,
    },
    /// A stage below the start stage; its artifact is taken by convention.
    StageReused {
        /// The stage.
        stage: ExecutionStage,
        /// Expected artifact path.
        artifact: PathBuf,
    },
    /// A stage was deliberately not invoked.
    StageSkipped {
        /// The stage.
        stage: ExecutionStage,
        /// Why.
        reason: String,
    },
    /// A stage persisted its artifact.
    StageCompleted {
        /// The stage.
        stage: ExecutionStage,
        /// The produced artifact.
        artifact: PathBuf,
        /// Wall-clock time of the agent call.
        duration_ms: u64,
    },
    /// A stage failed.
    StageFailed {
        /// The stage.
        stage: ExecutionStage,
        /// Rendered error.
        error: String,
        /// What the controller does about it.
        disposition: FailureDisposition,
    },
    /// Free-text progress, usually from inside an agent step.
    Message {
        /// The stage the message belongs to.
        stage: Option<ExecutionStage>,
        /// Display category.
        category: MessageCategory,
        /// The text.
        text: String,
    },
    /// Presence of all artifacts at the end of the run.
    Checklist {
        /// The checklist.
        checklist: ArtifactChecklist,
    },
    /// The run ended.
    RunFinished {
        /// Completed, degraded, stopped or failed.
        status: StageStatus,
    },
}

impl ProgressRecord {
    /// Creates an informational message for a stage.
    #[must_use]
    pub fn info(stage: ExecutionStage, text: impl Into<String>) -> Self {
        Self::Message {
            stage: Some(stage),
            category: MessageCategory::Info,
            text: text.into(),
        }
    }

    /// Creates a tool-invocation message for a stage.
    #[must_use]
    pub fn tool(stage: ExecutionStage, text: impl Into<String>) -> Self {
        Self::Message {
            stage: Some(stage),
            category: MessageCategory::ToolInvocation,
            text: text.into(),
        }
    }

    /// The stage this record is about, if any.
    #[must_use]
    pub fn stage(&self) -> Option<ExecutionStage> {
        match self {
            Self::RunStarted { start, .. } => Some(*start),
            Self::StageStarted { stage }
            | Self::StageReused { stage, .. }
            | Self::StageSkipped { stage, .. }
            | Self::StageCompleted { stage, .. }
            | Self::StageFailed { stage, .. } => Some(*stage),
            Self::Message { stage, .. } => *stage,
            Self::Checklist { .. } | Self::RunFinished { .. } => None,
        }
    }

    /// The status a UI should show after this record.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::RunStarted { .. } | Self::StageStarted { .. } | Self::Message { .. } | Self::Checklist { .. } => {
                StageStatus::Running
            }
            Self::StageReused { .. } => StageStatus::Reused,
            Self::StageSkipped { .. } => StageStatus::Skipped,
            Self::StageCompleted { .. } => StageStatus::Completed,
            Self::StageFailed { disposition, .. } => match disposition {
                FailureDisposition::UsageLimit => StageStatus::Stopped,
                FailureDisposition::Fatal => StageStatus::Failed,
                FailureDisposition::Degraded => StageStatus::Degraded,
            },
            Self::RunFinished { status } => *status,
        }
    }

    /// Display category of the record.
    #[must_use]
    pub fn category(&self) -> MessageCategory {
        match self {
            Self::Message { category, .. } => *category,
            Self::StageStarted { .. }
            | Self::StageReused { .. }
            | Self::StageSkipped { .. }
            | Self::StageCompleted { .. } => MessageCategory::StepTransition,
            _ => MessageCategory::Info,
        }
    }
}

impl fmt::Display for ProgressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { start, work_dir } => {
                write!(f, "Starting pipeline at {start} in {}", work_dir.display())
            }
            Self::StageStarted { stage } => write!(f, "Starting {stage}: {}", stage.description()),
            Self::StageReused { stage, artifact } => {
                write!(f, "{stage} already done, reusing {}", artifact.display())
            }
            Self::StageSkipped { stage, reason } => write!(f, "Skipping {stage}: {reason}"),
            Self::StageCompleted {
                stage,
                artifact,
                duration_ms,
            } => write!(
                f,
                "{stage} completed in {duration_ms}ms, wrote {}",
                artifact.display()
            ),
            Self::StageFailed {
                stage,
                error,
                disposition,
            } => match disposition {
                FailureDisposition::UsageLimit => write!(
                    f,
                    "Usage limit reached during {stage}: {error}. Resume later from the same working directory"
                ),
                FailureDisposition::Fatal => write!(f, "{stage} failed: {error}"),
                FailureDisposition::Degraded => {
                    write!(f, "{stage} failed, continuing without its artifact: {error}")
                }
            },
            Self::Message { text, .. } => f.write_str(text),
            Self::Checklist { checklist } => write!(f, "{checklist}"),
            Self::RunFinished { status } => write!(f, "Pipeline finished: {status}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_status_mapping() {
        let failed = |disposition| ProgressRecord::StageFailed {
            stage: ExecutionStage::Execution,
            error: "boom".to_string(),
            disposition,
        };
        assert_eq!(failed(FailureDisposition::UsageLimit).status(), StageStatus::Stopped);
        assert_eq!(failed(FailureDisposition::Fatal).status(), StageStatus::Failed);
        assert_eq!(failed(FailureDisposition::Degraded).status(), StageStatus::Degraded);
    }

    #[test]
    fn test_transitions_are_step_transitions() {
        let started = ProgressRecord::StageStarted {
            stage: ExecutionStage::SiteAnalysis,
        };
        assert_eq!(started.category(), MessageCategory::StepTransition);
        assert_eq!(
            ProgressRecord::tool(ExecutionStage::Execution, "browser.open").category(),
            MessageCategory::ToolInvocation
        );
        assert_eq!(
            ProgressRecord::RunFinished {
                status: StageStatus::Completed
            }
            .category(),
            MessageCategory::Info
        );
    }

    #[test]
    fn test_display_names_stage() {
        let record = ProgressRecord::StageSkipped {
            stage: ExecutionStage::Calibration,
            reason: "execution results report failures".to_string(),
        };
        assert_eq!(
            record.to_string(),
            "Skipping stage 5 (Calibration): execution results report failures"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let record = ProgressRecord::StageStarted {
            stage: ExecutionStage::CaseGeneration,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "stage_started");
        assert_eq!(json["stage"], "CASE_GENERATION");
    }
}
