//! Wire envelopes sent to UI consumers.
//!
//! Every frame is `{ "type", "data", "timestamp" }` with `type` one of
//! `chat`, `workflow`, `file`, `complete` or `error`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::{ExecutionStage, StageStatus};
use crate::events::MessageCategory;
use crate::pipeline::FailureRecord;
use crate::utils::{generate_id, iso_timestamp};

/// The envelope's `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A chat line.
    Chat,
    /// Workflow progress.
    Workflow,
    /// Artifact contents.
    File,
    /// The run finished.
    Complete,
    /// The run failed.
    Error,
}

/// One frame on the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// What the frame carries.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// The payload.
    pub data: Value,
    /// When the frame was created (RFC 3339).
    pub timestamp: String,
}

impl Envelope {
    /// Wraps a payload.
    #[must_use]
    pub fn new(kind: EventKind, payload: &impl Serialize) -> Self {
        let data = serde_json::to_value(payload)
            .unwrap_or_else(|e| serde_json::json!({ "serializationError": e.to_string() }));
        Self {
            kind,
            data,
            timestamp: iso_timestamp(),
        }
    }
}

/// Who a chat line is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Informational progress.
    Assistant,
    /// A tool invocation.
    Tool,
    /// A stage transition.
    System,
}

impl From<MessageCategory> for ChatRole {
    fn from(category: MessageCategory) -> Self {
        match category {
            MessageCategory::Info => Self::Assistant,
            MessageCategory::ToolInvocation => Self::Tool,
            MessageCategory::StepTransition => Self::System,
        }
    }
}

/// Payload of a `chat` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message id.
    pub id: String,
    /// Display role.
    pub role: ChatRole,
    /// The text.
    pub content: String,
    /// Stage ordinal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
    /// Stage name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
}

impl ChatMessage {
    /// Creates a chat line.
    #[must_use]
    pub fn new(role: ChatRole, content: impl Into<String>, stage: Option<ExecutionStage>) -> Self {
        Self {
            id: generate_id(),
            role,
            content: content.into(),
            stage: stage.map(ExecutionStage::ordinal),
            stage_name: stage.map(|s| s.name().to_string()),
        }
    }
}

/// Payload of a `workflow` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowUpdate {
    /// Ordinal of the most advanced stage seen so far.
    pub current_stage: u8,
    /// Its name.
    pub stage_name: String,
    /// Its description.
    pub stage_description: String,
    /// Overall progress, 0 to 100.
    pub progress: u8,
    /// Status after the record that triggered this update.
    pub status: StageStatus,
}

/// One artifact in a `file` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshot {
    /// Unique snapshot id.
    pub id: String,
    /// File name.
    pub name: String,
    /// Full path.
    pub path: String,
    /// File contents.
    pub content: String,
    /// `markdown` or `json`.
    pub kind: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time (RFC 3339).
    pub modified_at: String,
}

/// Payload of the terminal `complete` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    /// Completed, degraded or stopped.
    pub status: StageStatus,
    /// File name to presence.
    pub artifacts: BTreeMap<String, bool>,
    /// Tolerated best-effort failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureRecord>,
    /// Where a usage-limit stop happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<u8>,
}

/// Payload of the terminal `error` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// The top-level message.
    pub message: String,
    /// The error and its causes, one per line.
    pub stack: String,
    /// The failing stage, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
}

impl ErrorReport {
    /// Builds a report from an error and its `source()` chain.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + 'static), stage: Option<ExecutionStage>) -> Self {
        let stack = std::iter::successors(Some(err), |e| (*e).source())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            message: err.to_string(),
            stack,
            stage: stage.map(ExecutionStage::ordinal),
        }
    }
}
