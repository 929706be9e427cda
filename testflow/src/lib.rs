//! # Testflow
//!
//! A resumable, checkpointed controller for agent-driven web test generation.
//!
//! A run walks five ordered stages (site analysis, scenario generation,
//! case generation, execution, calibration). Each stage is delegated to an
//! external agent and leaves exactly one artifact in a working directory,
//! so an interrupted run can be resumed from the first stage whose artifact
//! is missing:
//!
//! - **Inspection**: infer the next stage from the artifacts on disk
//! - **Sequencing**: run the remaining stages, reusing earlier artifacts
//! - **Failure policy**: stop gracefully on provider throttling, abort on
//!   mandatory stage failures, degrade on best-effort ones
//! - **Streaming**: relay typed progress to a remote UI as JSON envelopes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use testflow::prelude::*;
//!
//! let inspection = inspect(work_dir).await;
//! let controller = PipelineController::builder(work_dir, config)
//!     .steps(CommandAgentStep::for_all_stages(&settings, &classifier))
//!     .observer(Arc::new(LoggingObserver))
//!     .build();
//!
//! let report = controller.run(inspection.next_stage).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod agents;
pub mod bridge;
pub mod cancellation;
pub mod classifier;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod inspector;
pub mod observability;
pub mod pipeline;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::agents::{AgentStep, CommandAgentStep, StepContext};
    pub use crate::bridge::{
        BridgeRun, ChannelSink, EnvelopeSink, NdjsonSink, StreamingBridge,
    };
    pub use crate::cancellation::AbortSignal;
    pub use crate::classifier::{UsageLimitClassifier, UsageLimitSignal};
    pub use crate::config::{AgentSettings, PipelineConfig, Priority};
    pub use crate::core::{
        ArtifactChecklist, ArtifactKind, ExecutionStage, StageStatus, StepOutcome,
    };
    pub use crate::errors::{AgentError, ConfigError, TestflowError};
    pub use crate::events::{
        CollectingObserver, LoggingObserver, NoOpObserver, ProgressObserver, ProgressRecord,
    };
    pub use crate::inspector::{inspect, InspectionResult};
    pub use crate::pipeline::{BestEffortPolicy, PipelineController, RunOutcome, RunReport};
    pub use crate::utils::{generate_id, iso_timestamp, Timestamp};
}
