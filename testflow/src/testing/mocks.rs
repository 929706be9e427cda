//! Mock agent steps for testing.

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::fixtures::{default_content, PASSING_RESULTS};
use crate::agents::{AgentStep, StepContext};
use crate::core::{ExecutionStage, StepOutcome};
use crate::errors::AgentError;
use crate::events::MessageCategory;

/// A step that writes fixed content and counts its calls.
#[derive(Debug)]
pub struct ScriptedStep {
    stage: ExecutionStage,
    content: String,
    persist: bool,
    delay: Option<Duration>,
    messages: Vec<(MessageCategory, String)>,
    call_count: Mutex<usize>,
    aborted: AtomicBool,
}

impl ScriptedStep {
    /// Creates a step that writes `content` as its artifact.
    #[must_use]
    pub fn new(stage: ExecutionStage, content: impl Into<String>) -> Self {
        Self {
            stage,
            content: content.into(),
            persist: true,
            delay: None,
            messages: Vec::new(),
            call_count: Mutex::new(0),
            aborted: AtomicBool::new(false),
        }
    }

    /// A step writing plausible content for its stage; execution reports success.
    #[must_use]
    pub fn for_stage(stage: ExecutionStage) -> Self {
        let content = if stage == ExecutionStage::Execution {
            PASSING_RESULTS.to_string()
        } else {
            default_content(stage)
        };
        Self::new(stage, content)
    }

    /// A step that reports success without writing anything.
    #[must_use]
    pub fn without_artifact(stage: ExecutionStage) -> Self {
        Self {
            persist: false,
            ..Self::for_stage(stage)
        }
    }

    /// Sleeps before writing.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reports a message through the step context before writing.
    #[must_use]
    pub fn with_message(mut self, category: MessageCategory, text: impl Into<String>) -> Self {
        self.messages.push((category, text.into()));
        self
    }

    /// Returns the number of times the step was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }

    /// True once a delayed call was cut short by its abort signal.
    #[must_use]
    pub fn was_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentStep for ScriptedStep {
    fn stage(&self) -> ExecutionStage {
        self.stage
    }

    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<StepOutcome> {
        *self.call_count.lock() += 1;

        for (category, text) in &self.messages {
            ctx.report(*category, text.clone()).await;
        }
        if let Some(delay) = self.delay {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = ctx.abort.aborted() => {
                    self.aborted.store(true, Ordering::SeqCst);
                    return Err(anyhow!("aborted"));
                }
            }
        }
        if self.persist {
            tokio::fs::write(&ctx.output, &self.content).await?;
        }
        Ok(StepOutcome::produced(&ctx.output))
    }
}

#[derive(Debug, Clone)]
enum Failure {
    Error(String),
    UsageLimit(String),
    Outcome(String),
}

/// A step that always fails.
#[derive(Debug)]
pub struct FailingStep {
    stage: ExecutionStage,
    failure: Failure,
    call_count: Mutex<usize>,
}

impl FailingStep {
    fn with(stage: ExecutionStage, failure: Failure) -> Self {
        Self {
            stage,
            failure,
            call_count: Mutex::new(0),
        }
    }

    /// Fails with a plain error carrying `message`.
    #[must_use]
    pub fn new(stage: ExecutionStage, message: impl Into<String>) -> Self {
        Self::with(stage, Failure::Error(message.into()))
    }

    /// Fails with an agent error tagged with the usage-limit code.
    #[must_use]
    pub fn usage_limit(stage: ExecutionStage, message: impl Into<String>) -> Self {
        Self::with(stage, Failure::UsageLimit(message.into()))
    }

    /// Returns a failed outcome instead of an error.
    #[must_use]
    pub fn outcome(stage: ExecutionStage, message: impl Into<String>) -> Self {
        Self::with(stage, Failure::Outcome(message.into()))
    }

    /// Returns the number of times the step was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl AgentStep for FailingStep {
    fn stage(&self) -> ExecutionStage {
        self.stage
    }

    async fn execute(&self, _ctx: &StepContext) -> anyhow::Result<StepOutcome> {
        *self.call_count.lock() += 1;
        match &self.failure {
            Failure::Error(message) => Err(anyhow!("{message}")),
            Failure::UsageLimit(message) => {
                Err(AgentError::usage_limit(message.clone()).for_stage(self.stage).into())
            }
            Failure::Outcome(message) => Ok(StepOutcome::failed(message.clone())),
        }
    }
}
