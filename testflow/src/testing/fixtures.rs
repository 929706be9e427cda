//! Fixtures for working-directory tests.

use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::core::{ArtifactKind, ExecutionStage};

/// An execution-result artifact reporting success.
pub const PASSING_RESULTS: &str = r#"{"stats":{"expected":5,"unexpected":0}}"#;

/// An execution-result artifact reporting failures.
pub const FAILING_RESULTS: &str = r#"{"stats":{"expected":4,"unexpected":1}}"#;

/// Plausible markdown content for a stage's artifact.
#[must_use]
pub fn default_content(stage: ExecutionStage) -> String {
    format!("# {}\n\n{}.\n", stage.name(), stage.description())
}

/// A configuration sufficient for every stage.
#[must_use]
pub fn sample_config(work_dir: &Path) -> PipelineConfig {
    PipelineConfig::new("https://shop.example.com", work_dir)
        .with_site_name("Example Shop")
        .with_requirement("guest checkout succeeds")
        .with_test_type("functional")
}

/// Writes one artifact into `work_dir`.
///
/// # Errors
///
/// Returns any IO error.
pub async fn write_artifact(
    work_dir: &Path,
    artifact: ArtifactKind,
    contents: &str,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(work_dir).await?;
    let path = artifact.path_in(work_dir);
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}

/// Writes the outputs of every stage up to and including `last`.
///
/// The execution-result artifact, if written, reports success.
///
/// # Errors
///
/// Returns any IO error.
pub async fn seed_through(work_dir: &Path, last: ExecutionStage) -> std::io::Result<()> {
    for stage in ExecutionStage::ALL.into_iter().filter(|s| *s <= last) {
        let contents = if stage == ExecutionStage::Execution {
            PASSING_RESULTS.to_string()
        } else {
            default_content(stage)
        };
        write_artifact(work_dir, ArtifactKind::output_of(stage), &contents).await?;
    }
    Ok(())
}
