//! Streaming a pipeline run to a remote UI.
//!
//! The bridge is an observer: it receives the controller's typed progress
//! records, forwards each one to the controller's own observer unchanged,
//! and renders it into wire envelopes. Nothing global is touched, so
//! streamed runs may overlap freely.
//!
//! Closing the stream (explicitly, or because the sink failed) only stops
//! emission. The run itself continues to completion.

mod envelope;
mod sink;
mod snapshot;

pub use envelope::{
    ChatMessage, ChatRole, CompletionSummary, Envelope, ErrorReport, EventKind, FileSnapshot,
    WorkflowUpdate,
};
pub use sink::{ChannelSink, CollectingSink, EnvelopeSink, NdjsonSink};
pub use snapshot::snapshot_artifacts;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

use crate::core::{ExecutionStage, StageStatus};
use crate::events::{ProgressObserver, ProgressRecord};
use crate::pipeline::{PipelineController, RunOutcome, RunReport};

/// Default pause before reading artifacts after a stage completes.
pub const DEFAULT_SNAPSHOT_DELAY: Duration = Duration::from_millis(500);

/// How a bridged run ended. The bridge itself never fails.
#[derive(Debug)]
pub enum BridgeRun {
    /// The controller returned a report (completed, degraded or stopped).
    Finished(RunReport),
    /// The controller raised; an `error` envelope was emitted.
    Failed {
        /// The rendered error.
        message: String,
    },
}

impl BridgeRun {
    /// Returns true unless the run raised.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Sink plus the closed flag, shared by the bridge and its observer.
struct Emitter {
    sink: Arc<dyn EnvelopeSink>,
    closed: AtomicBool,
}

impl Emitter {
    async fn emit(&self, envelope: Envelope) {
        if self.closed.load(Ordering::SeqCst) {
            trace!(kind = ?envelope.kind, "Stream closed, dropping envelope");
            return;
        }
        if let Err(e) = self.sink.send(&envelope).await {
            warn!(error = %e, "Stream consumer failed, closing stream");
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}

/// Adapts one pipeline run into an ordered envelope stream.
pub struct StreamingBridge {
    emitter: Arc<Emitter>,
    snapshot_delay: Duration,
}

impl std::fmt::Debug for StreamingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingBridge")
            .field("closed", &self.is_closed())
            .field("snapshot_delay", &self.snapshot_delay)
            .finish_non_exhaustive()
    }
}

impl StreamingBridge {
    /// Creates a bridge over `sink`.
    #[must_use]
    pub fn new(sink: impl EnvelopeSink + 'static) -> Self {
        Self::with_shared_sink(Arc::new(sink))
    }

    /// Creates a bridge over a shared sink.
    #[must_use]
    pub fn with_shared_sink(sink: Arc<dyn EnvelopeSink>) -> Self {
        Self {
            emitter: Arc::new(Emitter {
                sink,
                closed: AtomicBool::new(false),
            }),
            snapshot_delay: DEFAULT_SNAPSHOT_DELAY,
        }
    }

    /// Sets the pause before file snapshots.
    #[must_use]
    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = delay;
        self
    }

    /// Stops all further emission. Does not cancel the run.
    pub fn close(&self) {
        self.emitter.closed.store(true, Ordering::SeqCst);
    }

    /// Returns true once the stream is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.emitter.closed.load(Ordering::SeqCst)
    }

    /// Runs `controller` from `start`, streaming its progress.
    ///
    /// Ends with exactly one `complete` or `error` envelope (unless the
    /// stream was closed). Closing the transport is left to the caller.
    pub async fn run(&self, controller: &PipelineController, start: ExecutionStage) -> BridgeRun {
        let observer = Arc::new(BridgeObserver {
            inner: controller.observer(),
            emitter: Arc::clone(&self.emitter),
            work_dir: controller.work_dir().to_path_buf(),
            snapshot_delay: self.snapshot_delay,
            projection: Mutex::new(Projection::default()),
        });

        match controller.run_observed(start, observer).await {
            Ok(report) => {
                let summary = CompletionSummary {
                    status: report.outcome.status(),
                    artifacts: report.artifacts.to_map(),
                    failures: match &report.outcome {
                        RunOutcome::Degraded { failures } => failures.clone(),
                        _ => Vec::new(),
                    },
                    stopped_at: match &report.outcome {
                        RunOutcome::Stopped { stage, .. } => Some(stage.ordinal()),
                        _ => None,
                    },
                };
                self.emitter
                    .emit(Envelope::new(EventKind::Complete, &summary))
                    .await;
                BridgeRun::Finished(report)
            }
            Err(err) => {
                let report = ErrorReport::from_error(&err, err.stage());
                self.emitter.emit(Envelope::new(EventKind::Error, &report)).await;
                BridgeRun::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}

/// Stage ratchet and completion flag behind the progress figure.
#[derive(Debug, Default, Clone, Copy)]
struct Projection {
    current: u8,
    completed: bool,
}

impl Projection {
    fn advance(&mut self, record: &ProgressRecord) {
        if let Some(stage) = record.stage() {
            self.current = self.current.max(stage.ordinal());
        }
        if let ProgressRecord::RunFinished { status } = record {
            self.completed = matches!(status, StageStatus::Completed | StageStatus::Degraded);
        }
    }

    fn progress(self) -> u8 {
        if self.completed {
            return 100;
        }
        let total = u16::from(ExecutionStage::COUNT);
        let percent = (u16::from(self.current) * 100 + total / 2) / total;
        u8::try_from(percent).unwrap_or(100)
    }

    fn stage(self) -> ExecutionStage {
        ExecutionStage::from_ordinal(self.current).unwrap_or(ExecutionStage::SiteAnalysis)
    }
}

struct BridgeObserver {
    inner: Arc<dyn ProgressObserver>,
    emitter: Arc<Emitter>,
    work_dir: PathBuf,
    snapshot_delay: Duration,
    projection: Mutex<Projection>,
}

#[async_trait]
impl ProgressObserver for BridgeObserver {
    async fn observe(&self, record: &ProgressRecord) {
        self.inner.observe(record).await;

        let projection = {
            let mut projection = self.projection.lock();
            projection.advance(record);
            *projection
        };

        let chat = ChatMessage::new(record.category().into(), record.to_string(), record.stage());
        self.emitter.emit(Envelope::new(EventKind::Chat, &chat)).await;

        let stage = projection.stage();
        let update = WorkflowUpdate {
            current_stage: stage.ordinal(),
            stage_name: stage.name().to_string(),
            stage_description: stage.description().to_string(),
            progress: projection.progress(),
            status: record.status(),
        };
        self.emitter.emit(Envelope::new(EventKind::Workflow, &update)).await;

        if matches!(record, ProgressRecord::StageCompleted { .. }) {
            if !self.snapshot_delay.is_zero() {
                tokio::time::sleep(self.snapshot_delay).await;
            }
            let files = snapshot_artifacts(&self.work_dir).await;
            if !files.is_empty() {
                self.emitter.emit(Envelope::new(EventKind::File, &files)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratchet_never_moves_backwards() {
        let mut projection = Projection::default();
        projection.advance(&ProgressRecord::StageStarted {
            stage: ExecutionStage::Execution,
        });
        assert_eq!(projection.progress(), 80);

        projection.advance(&ProgressRecord::StageReused {
            stage: ExecutionStage::SiteAnalysis,
            artifact: PathBuf::from("site_analysis.md"),
        });
        assert_eq!(projection.current, 4);
        assert_eq!(projection.stage(), ExecutionStage::Execution);
    }

    #[test]
    fn test_completion_forces_full_progress() {
        let mut projection = Projection::default();
        projection.advance(&ProgressRecord::StageStarted {
            stage: ExecutionStage::SiteAnalysis,
        });
        assert_eq!(projection.progress(), 20);

        projection.advance(&ProgressRecord::RunFinished {
            status: StageStatus::Completed,
        });
        assert_eq!(projection.progress(), 100);
    }

    #[test]
    fn test_stopped_run_is_not_complete() {
        let mut projection = Projection::default();
        projection.advance(&ProgressRecord::StageStarted {
            stage: ExecutionStage::ScenarioGeneration,
        });
        projection.advance(&ProgressRecord::RunFinished {
            status: StageStatus::Stopped,
        });
        assert_eq!(projection.progress(), 40);
    }

    #[test]
    fn test_close_is_sticky() {
        let bridge = StreamingBridge::new(CollectingSink::new());
        assert!(!bridge.is_closed());
        bridge.close();
        assert!(bridge.is_closed());
    }
}
