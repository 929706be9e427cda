//! Uniform result contract for agent steps.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The outcome of one agent step invocation.
///
/// A successful outcome must name the artifact the step persisted; the
/// controller verifies that the file exists before trusting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    /// Whether the step succeeded.
    pub success: bool,

    /// Optional structured data returned by the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message (for failed steps).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The artifact written by the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_artifact_path: Option<PathBuf>,
}

impl StepOutcome {
    /// Creates a successful outcome for a persisted artifact.
    #[must_use]
    pub fn produced(path: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            produced_artifact_path: Some(path.into()),
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            produced_artifact_path: None,
        }
    }

    /// Attaches structured data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the produced path, if the step succeeded with one.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        if self.success {
            self.produced_artifact_path.as_deref()
        } else {
            None
        }
    }

    /// Returns the error message, with a fallback for silent failures.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("agent step reported failure without an error message")
    }
}
