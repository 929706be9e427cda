//! Testflow CLI - Main Entry Point
//!
//! `testflow inspect` reports where a working directory would resume;
//! `testflow run` resumes it, logging progress to stderr or streaming
//! NDJSON envelopes to stdout.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use testflow::agents::CommandAgentStep;
use testflow::bridge::{BridgeRun, NdjsonSink, StreamingBridge};
use testflow::classifier::UsageLimitClassifier;
use testflow::config::{AgentSettings, PipelineConfig, Priority};
use testflow::core::{ArtifactKind, ExecutionStage};
use testflow::events::LoggingObserver;
use testflow::inspector::{inspect, InspectionResult};
use testflow::observability::init_tracing;
use testflow::pipeline::{BestEffortPolicy, PipelineController, RunOutcome, RunReport};

/// Testflow - resumable agent-driven web test generation
#[derive(Parser)]
#[command(name = "testflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where a working directory would resume
    Inspect {
        /// Working directory holding the checkpoint artifacts
        #[arg(long, default_value = ".")]
        work_dir: PathBuf,

        /// Print the inspection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run (or resume) the pipeline
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Working directory holding the checkpoint artifacts
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Start stage (ordinal or name); defaults to the inspected next stage
    #[arg(long)]
    from: Option<ExecutionStage>,

    /// Site under test
    #[arg(long)]
    url: Option<String>,

    /// Display name for the site
    #[arg(long)]
    site_name: Option<String>,

    /// Requirement the scenarios must cover (repeatable)
    #[arg(long = "requirement")]
    requirements: Vec<String>,

    /// Kind of test to generate (repeatable)
    #[arg(long = "test-type")]
    test_types: Vec<String>,

    /// Upper bound on generated test cases
    #[arg(long)]
    max_cases: Option<u32>,

    /// Case priority: high, medium or low
    #[arg(long)]
    priority: Option<Priority>,

    /// Per-step timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Stream NDJSON envelopes to stdout
    #[arg(long)]
    stream: bool,

    /// Abort when a best-effort stage fails instead of degrading
    #[arg(long)]
    escalate_best_effort: bool,

    /// Agent executable
    #[arg(long, env = "TESTFLOW_AGENT_COMMAND")]
    agent_command: Option<String>,

    /// Agent argument (repeatable)
    #[arg(long = "agent-arg", allow_hyphen_values = true)]
    agent_args: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let classifier = Arc::new(UsageLimitClassifier::new());

    let result = match cli.command {
        Commands::Inspect { work_dir, json } => inspect_command(&work_dir, json).await,
        Commands::Run(args) => run_command(args, cli.verbose, &classifier).await,
    };

    match result {
        Ok(code) => code,
        Err(err) if classifier.classify_anyhow(&err).is_usage_limit => {
            warn!(error = %format!("{err:#}"), "Agent usage limit reached, resume later");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "Pipeline failed");
            ExitCode::FAILURE
        }
    }
}

async fn inspect_command(work_dir: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let result = inspect(work_dir).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_inspection(work_dir, &result);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_inspection(work_dir: &Path, result: &InspectionResult) {
    println!("Working directory: {}", work_dir.display());
    println!("Next stage:        {}", result.next_stage);
    println!("Reason:            {}", result.rationale);
    println!("Artifacts:");
    for artifact in ArtifactKind::ALL {
        let mark = if result.has(artifact) { "x" } else { " " };
        println!("  [{mark}] {artifact}");
    }
    if result.needs_fresh_config {
        println!("Configuration:     required (pass --url, --requirement, --test-type)");
    } else if let Some(path) = &result.config_path {
        println!("Configuration:     {}", path.display());
    }
}

async fn run_command(
    args: RunArgs,
    verbose: bool,
    classifier: &Arc<UsageLimitClassifier>,
) -> anyhow::Result<ExitCode> {
    let inspection = inspect(&args.work_dir).await;
    let start = args.from.unwrap_or(inspection.next_stage);
    info!(
        work_dir = %args.work_dir.display(),
        next_stage = %inspection.next_stage,
        start = %start,
        "Resolved start stage"
    );

    let config = resolve_config(&args, &inspection, start, verbose).await?;
    let settings = agent_settings(&args);
    let policy = if args.escalate_best_effort {
        BestEffortPolicy::Escalate
    } else {
        BestEffortPolicy::Tolerate
    };

    let controller = PipelineController::builder(&args.work_dir, config)
        .steps(CommandAgentStep::for_all_stages(&settings, classifier))
        .classifier(Arc::clone(classifier))
        .observer(Arc::new(LoggingObserver))
        .best_effort_policy(policy)
        .build();

    if args.stream {
        let bridge = StreamingBridge::new(NdjsonSink::new(tokio::io::stdout()));
        return match bridge.run(&controller, start).await {
            BridgeRun::Finished(report) => Ok(summarize(&report)),
            BridgeRun::Failed { message } => Err(anyhow::anyhow!(message)),
        };
    }

    let report = controller.run(start).await?;
    Ok(summarize(&report))
}

async fn resolve_config(
    args: &RunArgs,
    inspection: &InspectionResult,
    start: ExecutionStage,
    verbose: bool,
) -> anyhow::Result<PipelineConfig> {
    if let Some(url) = &args.url {
        let mut config = PipelineConfig::new(url, &args.work_dir);
        if let Some(name) = &args.site_name {
            config = config.with_site_name(name);
        }
        config.requirements.clone_from(&args.requirements);
        config.test_types.clone_from(&args.test_types);
        apply_overrides(&mut config, args, verbose);
        let path = config.save(&args.work_dir).await?;
        info!(path = %path.display(), "Saved configuration");
        return Ok(config);
    }

    let path = ArtifactKind::Config.path_in(&args.work_dir);
    let existing = if inspection.has(ArtifactKind::Config) {
        match PipelineConfig::load(&path).await {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable configuration");
                None
            }
        }
    } else {
        None
    };

    let mut config = match existing {
        Some(config) => config,
        None if start.needs_user_intent() => {
            bail!(
                "{start} needs configuration but {} has none; pass --url, --requirement and --test-type",
                args.work_dir.display()
            );
        }
        None => PipelineConfig::new("", &args.work_dir),
    };
    config
        .validate_for(start)
        .with_context(|| format!("configuration in {} cannot drive {start}", path.display()))?;
    apply_overrides(&mut config, args, verbose);
    Ok(config)
}

fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs, verbose: bool) {
    if let Some(max_cases) = args.max_cases {
        config.max_cases = max_cases;
    }
    if let Some(priority) = args.priority {
        config.priority = priority;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.work_dir.clone_from(&args.work_dir);
    config.verbose |= verbose;
}

fn agent_settings(args: &RunArgs) -> AgentSettings {
    let mut settings = match &args.agent_command {
        Some(command) => AgentSettings::new(command),
        None => AgentSettings::from_env(),
    };
    if !args.agent_args.is_empty() {
        settings.args.clone_from(&args.agent_args);
    }
    settings
}

fn summarize(report: &RunReport) -> ExitCode {
    match &report.outcome {
        RunOutcome::Completed => info!(invoked = report.invoked.len(), "Pipeline completed"),
        RunOutcome::Degraded { failures } => warn!(
            failures = failures.len(),
            "Pipeline completed without some best-effort artifacts"
        ),
        RunOutcome::Stopped { stage, reason } => warn!(
            stage = stage.slug(),
            reason = %reason,
            "Agent usage limit reached, resume later"
        ),
    }
    info!("{}", report.artifacts);
    ExitCode::SUCCESS
}
