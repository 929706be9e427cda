//! Configuration types.
//!
//! - [`PipelineConfig`]: per-run intent, persisted as the configuration artifact
//! - [`AgentSettings`]: how the external agent process is launched

mod agent;
mod pipeline;

pub use agent::{AgentSettings, AGENT_ARGS_ENV, AGENT_COMMAND_ENV};
pub use pipeline::{PipelineConfig, Priority};
