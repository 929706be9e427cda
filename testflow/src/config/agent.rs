//! Settings for the command-backed agent step.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variable overriding the agent command.
pub const AGENT_COMMAND_ENV: &str = "TESTFLOW_AGENT_COMMAND";

/// Environment variable overriding the agent arguments (whitespace separated).
pub const AGENT_ARGS_ENV: &str = "TESTFLOW_AGENT_ARGS";

/// How to launch the external AI agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Executable to spawn.
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments passed before the prompt is written to stdin.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Extra environment for the child process.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_command() -> String {
    "claude".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--print".to_string()]
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            env: HashMap::new(),
        }
    }
}

impl AgentSettings {
    /// Creates settings for a specific command with no arguments.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds an environment variable for the child.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Defaults with environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_overrides(
            std::env::var(AGENT_COMMAND_ENV).ok(),
            std::env::var(AGENT_ARGS_ENV).ok(),
        )
    }

    fn apply_overrides(mut self, command: Option<String>, args: Option<String>) -> Self {
        if let Some(command) = command.filter(|c| !c.trim().is_empty()) {
            self.command = command.trim().to_string();
        }
        if let Some(args) = args {
            self.args = args.split_whitespace().map(str::to_string).collect();
        }
        self
    }
}
