//! An agent step backed by an external command.

use anyhow::Context as _;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{stage_brief, AgentStep, StepContext};
use crate::classifier::UsageLimitClassifier;
use crate::config::AgentSettings;
use crate::core::{ExecutionStage, StepOutcome};
use crate::errors::AgentError;
use crate::events::MessageCategory;

/// Longest stderr excerpt carried in an error message.
const STDERR_EXCERPT: usize = 2000;

/// Runs the configured agent command and saves its stdout as the artifact.
///
/// The stage brief and upstream artifact contents go to the child's stdin.
/// A non-zero exit is classified with the shared classifier; throttling is
/// tagged with the structured usage-limit code so later layers need not
/// re-parse the text.
#[derive(Debug, Clone)]
pub struct CommandAgentStep {
    stage: ExecutionStage,
    settings: AgentSettings,
    classifier: Arc<UsageLimitClassifier>,
}

impl CommandAgentStep {
    /// Creates a step for one stage.
    #[must_use]
    pub fn new(
        stage: ExecutionStage,
        settings: AgentSettings,
        classifier: Arc<UsageLimitClassifier>,
    ) -> Self {
        Self {
            stage,
            settings,
            classifier,
        }
    }

    /// One step per stage, all sharing the same settings and classifier.
    #[must_use]
    pub fn for_all_stages(
        settings: &AgentSettings,
        classifier: &Arc<UsageLimitClassifier>,
    ) -> Vec<(ExecutionStage, Self)> {
        ExecutionStage::ALL
            .into_iter()
            .map(|stage| (stage, Self::new(stage, settings.clone(), Arc::clone(classifier))))
            .collect()
    }

    fn failure(&self, status: std::process::ExitStatus, stdout: &str, stderr: &str) -> AgentError {
        let stderr = stderr.trim();
        let excerpt = match stderr.char_indices().nth(STDERR_EXCERPT) {
            Some((idx, _)) => &stderr[..idx],
            None => stderr,
        };
        let message = format!("{} exited with {status}: {excerpt}", self.settings.command);

        let structured = serde_json::from_str::<serde_json::Value>(stdout.trim())
            .map(|value| self.classifier.classify_value(&value).is_usage_limit)
            .unwrap_or(false);

        let err = if structured || self.classifier.classify_text(&message).is_usage_limit {
            AgentError::usage_limit(message)
        } else {
            AgentError::new(message)
        };
        err.for_stage(self.stage)
    }
}

#[async_trait]
impl AgentStep for CommandAgentStep {
    fn stage(&self) -> ExecutionStage {
        self.stage
    }

    async fn execute(&self, ctx: &StepContext) -> anyhow::Result<StepOutcome> {
        let inputs = ctx.read_inputs().await.context("reading upstream artifacts")?;
        let brief = stage_brief(self.stage, &ctx.config, &inputs);

        let mut child = Command::new(&self.settings.command)
            .args(&self.settings.args)
            .envs(&self.settings.env)
            .current_dir(&ctx.work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch agent command '{}'", self.settings.command))?;

        ctx.report(
            MessageCategory::ToolInvocation,
            format!("Launched {} for {}", self.settings.command, self.stage.name()),
        )
        .await;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The agent may exit before reading everything; that is reported by its status.
                if let Err(e) = stdin.write_all(brief.as_bytes()).await {
                    debug!(error = %e, "Agent closed stdin early");
                }
            }
        };

        let output = tokio::select! {
            ((), output) = async { tokio::join!(feed, child.wait_with_output()) } => {
                output.context("waiting for agent command")?
            }
            () = ctx.abort.aborted() => {
                let reason = ctx.abort.reason().unwrap_or_else(|| "aborted".to_string());
                return Err(AgentError::new(format!("agent call aborted: {reason}"))
                    .for_stage(self.stage)
                    .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(self.failure(output.status, &stdout, &stderr).into());
        }
        if stdout.trim().is_empty() {
            return Err(AgentError::new(format!("{} produced no output", self.settings.command))
                .for_stage(self.stage)
                .into());
        }

        tokio::fs::write(&ctx.output, stdout.as_bytes())
            .await
            .with_context(|| format!("writing {}", ctx.output.display()))?;

        Ok(StepOutcome::produced(&ctx.output)
            .with_data(serde_json::json!({ "bytes": output.stdout.len() })))
    }
}
