//! The resumable pipeline controller.

use anyhow::anyhow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::policy::{disposition, BestEffortPolicy, FailureRecord};
use super::report::{RunOutcome, RunReport};
use super::table::{StageSpec, STAGE_TABLE};
use crate::agents::{AgentStep, StepContext};
use crate::classifier::UsageLimitClassifier;
use crate::config::PipelineConfig;
use crate::core::{ArtifactChecklist, ArtifactKind, ExecutionStage, StageStatus};
use crate::errors::{AgentError, TestflowError};
use crate::events::{FailureDisposition, NoOpObserver, ProgressObserver, ProgressRecord};
use crate::inspector::{read_verdict, ResultVerdict};
use crate::observability::SpanTimer;

/// How long a timed-out step gets to observe its abort signal and settle.
pub const ABORT_GRACE: Duration = Duration::from_secs(2);

/// Builder for [`PipelineController`].
pub struct PipelineControllerBuilder {
    work_dir: PathBuf,
    config: Arc<PipelineConfig>,
    steps: BTreeMap<ExecutionStage, Arc<dyn AgentStep>>,
    observer: Arc<dyn ProgressObserver>,
    classifier: Arc<UsageLimitClassifier>,
    policy: BestEffortPolicy,
    step_timeout: Option<Duration>,
}

impl PipelineControllerBuilder {
    /// Registers the step for a stage, replacing any previous one.
    #[must_use]
    pub fn step(mut self, stage: ExecutionStage, step: impl AgentStep + 'static) -> Self {
        self.steps.insert(stage, Arc::new(step));
        self
    }

    /// Registers a shared step for a stage.
    #[must_use]
    pub fn shared_step(mut self, stage: ExecutionStage, step: Arc<dyn AgentStep>) -> Self {
        self.steps.insert(stage, step);
        self
    }

    /// Registers several steps.
    #[must_use]
    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = (ExecutionStage, S)>,
        S: AgentStep + 'static,
    {
        for (stage, step) in steps {
            self.steps.insert(stage, Arc::new(step));
        }
        self
    }

    /// Sets the progress observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the shared usage-limit classifier.
    #[must_use]
    pub fn classifier(mut self, classifier: Arc<UsageLimitClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the best-effort failure policy.
    #[must_use]
    pub fn best_effort_policy(mut self, policy: BestEffortPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Overrides the per-step timeout from the configuration.
    #[must_use]
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Builds the controller.
    #[must_use]
    pub fn build(self) -> PipelineController {
        let step_timeout = self.step_timeout.unwrap_or_else(|| self.config.step_timeout());
        PipelineController {
            work_dir: self.work_dir,
            config: self.config,
            steps: self.steps,
            observer: self.observer,
            classifier: self.classifier,
            policy: self.policy,
            step_timeout,
        }
    }
}

/// Sequences the five agent steps over a checkpointed working directory.
///
/// Stages run strictly one after another; each consumes the previous
/// stage's artifact. Stages below the start stage are never invoked and
/// their artifacts are taken by convention.
pub struct PipelineController {
    work_dir: PathBuf,
    config: Arc<PipelineConfig>,
    steps: BTreeMap<ExecutionStage, Arc<dyn AgentStep>>,
    observer: Arc<dyn ProgressObserver>,
    classifier: Arc<UsageLimitClassifier>,
    policy: BestEffortPolicy,
    step_timeout: Duration,
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("work_dir", &self.work_dir)
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("step_timeout", &self.step_timeout)
            .finish_non_exhaustive()
    }
}

impl PipelineController {
    /// Starts building a controller for `work_dir`.
    #[must_use]
    pub fn builder(work_dir: impl Into<PathBuf>, config: PipelineConfig) -> PipelineControllerBuilder {
        PipelineControllerBuilder {
            work_dir: work_dir.into(),
            config: Arc::new(config),
            steps: BTreeMap::new(),
            observer: Arc::new(NoOpObserver),
            classifier: Arc::new(UsageLimitClassifier::new()),
            policy: BestEffortPolicy::default(),
            step_timeout: None,
        }
    }

    /// The working directory.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The configured observer.
    #[must_use]
    pub fn observer(&self) -> Arc<dyn ProgressObserver> {
        Arc::clone(&self.observer)
    }

    /// The shared classifier.
    #[must_use]
    pub fn classifier(&self) -> Arc<UsageLimitClassifier> {
        Arc::clone(&self.classifier)
    }

    /// The best-effort policy.
    #[must_use]
    pub fn best_effort_policy(&self) -> BestEffortPolicy {
        self.policy
    }

    /// Runs every stage from `start` onward.
    ///
    /// A usage-limit stop is not an error: it returns `Ok` with a
    /// [`RunOutcome::Stopped`] and leaves the artifacts for a resumed run.
    ///
    /// # Errors
    ///
    /// Returns `MandatoryStageFailure` when a stage 1-3 fails or an upstream
    /// artifact is missing, `DegradedStageFailure` when a best-effort stage
    /// fails under [`BestEffortPolicy::Escalate`], and `Config` when the
    /// configuration cannot drive the start stage.
    pub async fn run(&self, start: ExecutionStage) -> Result<RunReport, TestflowError> {
        self.run_observed(start, Arc::clone(&self.observer)).await
    }

    /// Runs with a different observer than the configured one.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_observed(
        &self,
        start: ExecutionStage,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<RunReport, TestflowError> {
        let result = self.drive(start, &observer).await;

        let artifacts = ArtifactChecklist::scan(&self.work_dir).await;
        observer
            .observe(&ProgressRecord::Checklist {
                checklist: artifacts.clone(),
            })
            .await;

        let status = match &result {
            Ok((outcome, _)) => outcome.status(),
            Err(_) => StageStatus::Failed,
        };
        observer.observe(&ProgressRecord::RunFinished { status }).await;

        result.map(|(outcome, invoked)| RunReport {
            outcome,
            artifacts,
            invoked,
        })
    }

    async fn drive(
        &self,
        start: ExecutionStage,
        observer: &Arc<dyn ProgressObserver>,
    ) -> Result<(RunOutcome, Vec<ExecutionStage>), TestflowError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        observer
            .observe(&ProgressRecord::RunStarted {
                start,
                work_dir: self.work_dir.clone(),
            })
            .await;

        self.config.validate_for(start)?;

        let mut invoked = Vec::new();
        let mut failures = Vec::new();

        for spec in &STAGE_TABLE {
            let stage = spec.stage;
            let output = spec.output_path(&self.work_dir);

            if stage < start {
                observer
                    .observe(&ProgressRecord::StageReused {
                        stage,
                        artifact: output,
                    })
                    .await;
                continue;
            }

            if let Some(reason) = self.skip_reason(stage, &output).await {
                observer.observe(&ProgressRecord::StageSkipped { stage, reason }).await;
                continue;
            }

            if stage > start && stage.needs_user_intent() {
                self.config.validate_for(stage)?;
            }

            let inputs = match self.upstream_inputs(spec).await {
                Ok(inputs) => inputs,
                Err(reason) => {
                    observer
                        .observe(&ProgressRecord::StageFailed {
                            stage,
                            error: reason.clone(),
                            disposition: FailureDisposition::Fatal,
                        })
                        .await;
                    return Err(TestflowError::mandatory(stage, reason));
                }
            };

            observer.observe(&ProgressRecord::StageStarted { stage }).await;
            invoked.push(stage);
            let timer = SpanTimer::start(stage.slug());

            match self.invoke(stage, inputs, output, observer).await {
                Ok(artifact) => {
                    observer
                        .observe(&ProgressRecord::StageCompleted {
                            stage,
                            artifact,
                            duration_ms: timer.finish_ms(),
                        })
                        .await;
                }
                Err(err) => {
                    let signal = self.classifier.classify_anyhow(&err);
                    let error = format!("{err:#}");
                    let disposition = disposition(stage, signal.is_usage_limit);
                    observer
                        .observe(&ProgressRecord::StageFailed {
                            stage,
                            error: error.clone(),
                            disposition,
                        })
                        .await;

                    match disposition {
                        FailureDisposition::UsageLimit => {
                            return Ok((RunOutcome::Stopped { stage, reason: error }, invoked));
                        }
                        FailureDisposition::Fatal => {
                            return Err(TestflowError::mandatory(stage, error));
                        }
                        FailureDisposition::Degraded if self.policy.escalates() => {
                            return Err(TestflowError::DegradedStageFailure { stage, reason: error });
                        }
                        FailureDisposition::Degraded => {
                            failures.push(FailureRecord::new(stage, error));
                        }
                    }
                }
            }
        }

        let outcome = if failures.is_empty() {
            RunOutcome::Completed
        } else {
            RunOutcome::Degraded { failures }
        };
        Ok((outcome, invoked))
    }

    /// Rules that skip an in-range stage without invoking it.
    async fn skip_reason(&self, stage: ExecutionStage, output: &Path) -> Option<String> {
        match stage {
            ExecutionStage::Execution => exists(output)
                .await
                .then(|| format!("{} already exists", ArtifactKind::ExecutionResults)),
            ExecutionStage::Calibration => {
                if exists(output).await {
                    return Some(format!("{} already exists", ArtifactKind::Calibration));
                }
                let results = ArtifactKind::ExecutionResults.path_in(&self.work_dir);
                match read_verdict(&results).await {
                    ResultVerdict::Passed => None,
                    ResultVerdict::Absent => Some("no execution results to calibrate against".to_string()),
                    ResultVerdict::Failed => Some("execution results report failures".to_string()),
                    ResultVerdict::Unreadable => Some("execution results cannot be parsed".to_string()),
                }
            }
            _ => None,
        }
    }

    async fn upstream_inputs(&self, spec: &StageSpec) -> Result<Vec<PathBuf>, String> {
        let mut paths = Vec::with_capacity(spec.inputs.len());
        for (kind, path) in spec.input_paths(&self.work_dir) {
            if !exists(&path).await {
                return Err(format!(
                    "missing upstream artifact {kind} (expected at {})",
                    path.display()
                ));
            }
            paths.push(path);
        }
        Ok(paths)
    }

    async fn invoke(
        &self,
        stage: ExecutionStage,
        inputs: Vec<PathBuf>,
        output: PathBuf,
        observer: &Arc<dyn ProgressObserver>,
    ) -> anyhow::Result<PathBuf> {
        let Some(step) = self.steps.get(&stage) else {
            return Err(AgentError::new(format!("no agent step registered for {stage}"))
                .for_stage(stage)
                .into());
        };

        let ctx = StepContext::new(
            stage,
            &self.work_dir,
            inputs,
            &output,
            Arc::clone(&self.config),
            Arc::clone(observer),
        );
        let abort = ctx.abort.clone();

        let execution = step.execute(&ctx);
        tokio::pin!(execution);

        let outcome = tokio::select! {
            result = &mut execution => result?,
            () = tokio::time::sleep(self.step_timeout) => {
                let reason = format!("timed out after {}ms", self.step_timeout.as_millis());
                abort.abort(reason.clone());
                if tokio::time::timeout(ABORT_GRACE, &mut execution).await.is_err() {
                    warn!(
                        stage = stage.slug(),
                        grace_ms = ABORT_GRACE.as_millis(),
                        "Step did not settle after abort"
                    );
                }
                return Err(AgentError::new(format!("{stage} {reason}")).for_stage(stage).into());
            }
        };

        if !outcome.success {
            let mut err = AgentError::new(outcome.error_message()).for_stage(stage);
            if let Some(data) = &outcome.data {
                if self.classifier.classify_value(data).is_usage_limit {
                    err = AgentError::usage_limit(outcome.error_message()).for_stage(stage);
                }
            }
            return Err(err.into());
        }

        if let Some(produced) = outcome.artifact() {
            if produced != output {
                warn!(
                    stage = stage.slug(),
                    produced = %produced.display(),
                    expected = %output.display(),
                    "Step reported an artifact outside the checkpoint contract"
                );
            }
        }
        if !exists(&output).await {
            return Err(anyhow!(
                "{stage} reported success but {} was not written",
                output.display()
            ));
        }

        debug!(stage = stage.slug(), artifact = %output.display(), "Stage artifact persisted");
        Ok(output)
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
