//! Error types for testflow.
//!
//! The taxonomy follows the run semantics: a usage-limit stop is not an
//! error at all (it is a [`RunOutcome`](crate::pipeline::RunOutcome)), a
//! mandatory stage failure aborts the run, and a degraded failure only
//! surfaces as an error under the escalating best-effort policy.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::ExecutionStage;

/// Structured error code an agent attaches when the provider throttled it.
pub const USAGE_LIMIT_CODE: &str = "USAGE_LIMIT_REACHED";

/// The main error type for testflow operations.
#[derive(Debug, Error)]
pub enum TestflowError {
    /// A stage 1-3 failed for a reason other than throttling, or a stage
    /// could not start because an upstream artifact is missing.
    #[error("{stage} failed: {reason}")]
    MandatoryStageFailure {
        /// The stage that failed.
        stage: ExecutionStage,
        /// What went wrong.
        reason: String,
    },

    /// A stage 4-5 failed and the best-effort policy escalates.
    #[error("{stage} failed (best-effort stage): {reason}")]
    DegradedStageFailure {
        /// The stage that failed.
        stage: ExecutionStage,
        /// What went wrong.
        reason: String,
    },

    /// The configuration is not usable for the requested stage.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TestflowError {
    /// Creates a mandatory stage failure.
    #[must_use]
    pub fn mandatory(stage: ExecutionStage, reason: impl Into<String>) -> Self {
        Self::MandatoryStageFailure {
            stage,
            reason: reason.into(),
        }
    }

    /// Returns the stage the error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<ExecutionStage> {
        match self {
            Self::MandatoryStageFailure { stage, .. } | Self::DegradedStageFailure { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}

/// Errors raised while loading or validating a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field the stage needs is missing or empty.
    #[error("configuration field '{field}' is required for {stage}")]
    MissingField {
        /// The camelCase field name.
        field: &'static str,
        /// The stage that needs it.
        stage: ExecutionStage,
    },

    /// A field is present but unusable.
    #[error("configuration field '{field}' is invalid: {reason}")]
    InvalidField {
        /// The camelCase field name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration artifact could not be read.
    #[error("failed to read configuration at {}: {source}", path.display())]
    Unreadable {
        /// Where the artifact was expected.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration artifact is not valid JSON for a pipeline config.
    #[error("failed to parse configuration at {}: {source}", path.display())]
    Malformed {
        /// The offending artifact.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

/// A structured failure reported by an agent step.
///
/// The optional `code` and `retryable` fields are the structured markers the
/// usage-limit classifier checks before falling back to text matching.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AgentError {
    /// The stage that raised the error.
    pub stage: Option<ExecutionStage>,
    /// Machine-readable error code.
    pub code: Option<String>,
    /// Explicit retry hint; `Some(false)` marks a throttled provider.
    pub retryable: Option<bool>,
    /// Human-readable message.
    pub message: String,
}

impl AgentError {
    /// Creates a plain agent error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            stage: None,
            code: None,
            retryable: None,
            message: message.into(),
        }
    }

    /// Creates an error tagged with the usage-limit code.
    #[must_use]
    pub fn usage_limit(message: impl Into<String>) -> Self {
        Self::new(message).with_code(USAGE_LIMIT_CODE)
    }

    /// Sets the stage.
    #[must_use]
    pub fn for_stage(mut self, stage: ExecutionStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the retry hint.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    /// Returns true if the error carries a structured usage-limit marker.
    #[must_use]
    pub fn has_usage_limit_marker(&self) -> bool {
        self.code.as_deref() == Some(USAGE_LIMIT_CODE) || self.retryable == Some(false)
    }
}

/// Errors raised by an envelope sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The receiving side went away.
    #[error("stream consumer disconnected")]
    Closed,

    /// The envelope could not be written.
    #[error("failed to write envelope: {0}")]
    Io(#[from] std::io::Error),

    /// The envelope could not be serialized.
    #[error("failed to serialize envelope: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mandatory_failure_message() {
        let err = TestflowError::mandatory(ExecutionStage::Execution, "missing upstream artifact test_cases.md");
        assert_eq!(err.stage(), Some(ExecutionStage::Execution));
        assert!(err.to_string().contains("stage 4 (Execution)"));
        assert!(err.to_string().contains("test_cases.md"));
    }

    #[test]
    fn test_agent_error_markers() {
        assert!(AgentError::usage_limit("slow down").has_usage_limit_marker());
        assert!(AgentError::new("x").with_retryable(false).has_usage_limit_marker());
        assert!(!AgentError::new("x").with_retryable(true).has_usage_limit_marker());
        assert!(!AgentError::new("x").with_code("E_TIMEOUT").has_usage_limit_marker());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingField {
            field: "targetUrl",
            stage: ExecutionStage::SiteAnalysis,
        };
        assert_eq!(
            err.to_string(),
            "configuration field 'targetUrl' is required for stage 1 (Site analysis)"
        );
    }

    #[test]
    fn test_config_error_converts() {
        let err: TestflowError = ConfigError::InvalidField {
            field: "maxCases",
            reason: "must be positive".to_string(),
        }
        .into();
        assert!(matches!(err, TestflowError::Config(_)));
        assert_eq!(err.stage(), None);
    }
}
