//! Pipeline sequencing.
//!
//! This module provides:
//! - The static stage table
//! - The controller and its builder
//! - Failure handling policy for best-effort stages
//! - The run report

mod controller;
mod policy;
mod report;
mod table;


pub use controller::{PipelineController, PipelineControllerBuilder};
pub use policy::{disposition, BestEffortPolicy, FailureRecord};
pub use report::{RunOutcome, RunReport};
pub use table::{StageSpec, STAGE_TABLE};
