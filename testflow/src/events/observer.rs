//! Progress observer trait and implementations.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::record::{FailureDisposition, MessageCategory, ProgressRecord};
use crate::core::ExecutionStage;

/// Receives the controller's progress records in order.
///
/// Observers are injected into the controller rather than installed
/// globally, so concurrent runs each report to their own observer.
#[async_trait]
pub trait ProgressObserver: Send + Sync {
    /// Handles one record. Must not fail; observers swallow their own errors.
    async fn observe(&self, record: &ProgressRecord);
}

/// An observer that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

#[async_trait]
impl ProgressObserver for NoOpObserver {
    async fn observe(&self, _record: &ProgressRecord) {
        // Intentionally empty - discards all records
    }
}

/// Renders records as the human-readable progress log through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    fn log(record: &ProgressRecord) {
        let stage = record.stage().map(ExecutionStage::slug);
        match record {
            ProgressRecord::StageFailed {
                disposition: FailureDisposition::Fatal,
                ..
            } => error!(stage, "{record}"),
            ProgressRecord::StageFailed { .. } | ProgressRecord::StageSkipped { .. } => {
                warn!(stage, "{record}");
            }
            ProgressRecord::Message {
                category: MessageCategory::ToolInvocation,
                ..
            } => debug!(stage, "{record}"),
            ProgressRecord::StageCompleted { duration_ms, .. } => {
                info!(stage, duration_ms, "{record}");
            }
            _ => info!(stage, "{record}"),
        }
    }
}

#[async_trait]
impl ProgressObserver for LoggingObserver {
    async fn observe(&self, record: &ProgressRecord) {
        Self::log(record);
    }
}

/// An observer that keeps every record, for tests and post-run inspection.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    records: RwLock<Vec<ProgressRecord>>,
}

impl CollectingObserver {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records.
    #[must_use]
    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.read().clone()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Stages that were invoked, in order.
    #[must_use]
    pub fn started_stages(&self) -> Vec<ExecutionStage> {
        self.records
            .read()
            .iter()
            .filter_map(|record| match record {
                ProgressRecord::StageStarted { stage } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    /// Returns true if any record matches the predicate.
    pub fn any(&self, predicate: impl Fn(&ProgressRecord) -> bool) -> bool {
        self.records.read().iter().any(predicate)
    }
}

#[async_trait]
impl ProgressObserver for CollectingObserver {
    async fn observe(&self, record: &ProgressRecord) {
        self.records.write().push(record.clone());
    }
}
