//! The agent step boundary.
//!
//! Each stage is implemented by an [`AgentStep`] that reads its upstream
//! artifacts, delegates to an external agent and persists exactly one new
//! artifact before returning success.

mod command;
mod prompt;

pub use command::CommandAgentStep;
pub use prompt::stage_brief;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cancellation::AbortSignal;
use crate::config::PipelineConfig;
use crate::core::{ExecutionStage, StepOutcome};
use crate::events::{MessageCategory, ProgressObserver, ProgressRecord};

/// One stage's implementation.
///
/// The controller invokes a step at most once per run, and only for an
/// unresolved stage. On success the declared output must already be on disk.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentStep: Send + Sync {
    /// The stage this step implements.
    fn stage(&self) -> ExecutionStage;

    /// Runs the step.
    ///
    /// Errors may have any shape; the controller classifies them.
    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<StepOutcome>;
}

/// Everything a step needs for one invocation.
#[derive(Clone)]
pub struct StepContext {
    /// The stage being run.
    pub stage: ExecutionStage,
    /// The working directory.
    pub work_dir: PathBuf,
    /// Upstream artifacts, in stage-table order.
    pub inputs: Vec<PathBuf>,
    /// Where the step must write its artifact.
    pub output: PathBuf,
    /// The run's configuration.
    pub config: Arc<PipelineConfig>,
    /// Fired when the step should stop (e.g. its timeout elapsed).
    pub abort: AbortSignal,
    observer: Arc<dyn ProgressObserver>,
}

impl StepContext {
    /// Creates a context.
    #[must_use]
    pub fn new(
        stage: ExecutionStage,
        work_dir: impl Into<PathBuf>,
        inputs: Vec<PathBuf>,
        output: impl Into<PathBuf>,
        config: Arc<PipelineConfig>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            stage,
            work_dir: work_dir.into(),
            inputs,
            output: output.into(),
            config,
            abort: AbortSignal::new(),
            observer,
        }
    }

    /// Reports a free-text progress message for this stage.
    pub async fn report(&self, category: MessageCategory, text: impl Into<String>) {
        self.observer
            .observe(&ProgressRecord::Message {
                stage: Some(self.stage),
                category,
                text: text.into(),
            })
            .await;
    }

    /// Reads every upstream artifact as text.
    ///
    /// # Errors
    ///
    /// Returns the first IO error.
    pub async fn read_inputs(&self) -> std::io::Result<Vec<(PathBuf, String)>> {
        let mut contents = Vec::with_capacity(self.inputs.len());
        for path in &self.inputs {
            contents.push((path.clone(), tokio::fs::read_to_string(path).await?));
        }
        Ok(contents)
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("stage", &self.stage)
            .field("work_dir", &self.work_dir)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("abort", &self.abort)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingObserver;

    #[tokio::test]
    async fn test_report_goes_to_observer() {
        let observer = Arc::new(CollectingObserver::new());
        let ctx = StepContext::new(
            ExecutionStage::Execution,
            "/tmp/run",
            Vec::new(),
            "/tmp/run/test_results.json",
            Arc::new(PipelineConfig::default()),
            observer.clone(),
        );

        ctx.report(MessageCategory::ToolInvocation, "browser.goto /cart").await;

        assert_eq!(
            observer.records(),
            vec![ProgressRecord::tool(ExecutionStage::Execution, "browser.goto /cart")]
        );
    }

    #[tokio::test]
    async fn test_read_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("site_analysis.md");
        std::fs::write(&input, "# Site").unwrap();

        let ctx = StepContext::new(
            ExecutionStage::ScenarioGeneration,
            dir.path(),
            vec![input.clone()],
            dir.path().join("test_scenarios.md"),
            Arc::new(PipelineConfig::default()),
            Arc::new(crate::events::NoOpObserver),
        );

        assert_eq!(ctx.read_inputs().await.unwrap(), vec![(input, "# Site".to_string())]);
    }
}
