//! Testing utilities for testflow pipelines.
//!
//! This module provides:
//! - Scripted and failing agent steps
//! - Working-directory fixtures

pub mod fixtures;
mod mocks;

pub use fixtures::{sample_config, seed_through, write_artifact, FAILING_RESULTS, PASSING_RESULTS};
pub use mocks::{FailingStep, ScriptedStep};
