//! Core domain model types for testflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The ordered execution stages
//! - The well-known checkpoint artifacts and their presence checklist
//! - Stage status and the agent step outcome

mod artifact;
mod checklist;
mod output;
mod stage;
mod status;

pub use artifact::ArtifactKind;
pub use checklist::{ArtifactChecklist, ChecklistEntry};
pub use output::StepOutcome;
pub use stage::ExecutionStage;
pub use status::StageStatus;
