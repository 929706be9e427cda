//! Working-directory inspection.
//!
//! [`inspect`] scans a working directory for the well-known checkpoint
//! artifacts and infers where a run should resume. It never fails: any
//! I/O problem collapses to the ground state.

mod results;
mod state;

pub use results::{
    evaluate_results, flatten_tests, read_verdict, ResultVerdict, TestEntry, EXPECTED_STATUS,
};
pub use state::CheckpointState;

use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::core::{ArtifactKind, ExecutionStage};

/// What a working directory says about resuming a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionResult {
    /// The first unresolved stage.
    pub next_stage: ExecutionStage,
    /// Artifacts found in the directory.
    pub existing_artifacts: Vec<ArtifactKind>,
    /// Why `next_stage` was chosen.
    pub rationale: String,
    /// A configuration artifact exists and is sufficient for `next_stage`.
    pub config_usable: bool,
    /// Path of the usable configuration artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    /// The caller must collect configuration before running.
    pub needs_fresh_config: bool,
}

impl InspectionResult {
    /// The result for an empty (or unreadable) working directory.
    #[must_use]
    pub fn ground() -> Self {
        Self {
            next_stage: ExecutionStage::SiteAnalysis,
            existing_artifacts: Vec::new(),
            rationale: CheckpointState::GROUND.rationale().to_string(),
            config_usable: false,
            config_path: None,
            needs_fresh_config: true,
        }
    }

    /// Returns true if `artifact` was found.
    #[must_use]
    pub fn has(&self, artifact: ArtifactKind) -> bool {
        self.existing_artifacts.contains(&artifact)
    }
}

/// Inspects `work_dir`, creating it if it does not exist.
pub async fn inspect(work_dir: &Path) -> InspectionResult {
    match try_inspect(work_dir).await {
        Ok(result) => {
            tracing::debug!(
                work_dir = %work_dir.display(),
                next_stage = %result.next_stage,
                needs_fresh_config = result.needs_fresh_config,
                "Inspected working directory"
            );
            result
        }
        Err(e) => {
            tracing::warn!(
                work_dir = %work_dir.display(),
                error = %e,
                "Inspection failed, falling back to a fresh run"
            );
            InspectionResult::ground()
        }
    }
}

async fn try_inspect(work_dir: &Path) -> std::io::Result<InspectionResult> {
    tokio::fs::create_dir_all(work_dir).await?;

    let mut names = HashSet::new();
    let mut entries = tokio::fs::read_dir(work_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }

    let existing_artifacts: Vec<ArtifactKind> = ArtifactKind::ALL
        .into_iter()
        .filter(|artifact| names.contains(artifact.file_name()))
        .collect();
    let present = |artifact: ArtifactKind| existing_artifacts.contains(&artifact);

    let results = if present(ArtifactKind::ExecutionResults) {
        read_verdict(&ArtifactKind::ExecutionResults.path_in(work_dir)).await
    } else {
        ResultVerdict::Absent
    };

    let state = CheckpointState {
        analysis: present(ArtifactKind::Analysis),
        scenarios: present(ArtifactKind::Scenarios),
        test_cases: present(ArtifactKind::TestCases),
        results,
        calibration: present(ArtifactKind::Calibration),
    };
    let next_stage = state.next_stage();

    let mut result = InspectionResult {
        next_stage,
        rationale: state.rationale().to_string(),
        config_usable: false,
        config_path: None,
        needs_fresh_config: next_stage.needs_user_intent(),
        existing_artifacts,
    };

    if result.has(ArtifactKind::Config) {
        let path = ArtifactKind::Config.path_in(work_dir);
        match PipelineConfig::load(&path).await.and_then(|config| config.validate_for(next_stage)) {
            Ok(()) => {
                result.config_usable = true;
                result.config_path = Some(path);
                result.needs_fresh_config = false;
            }
            Err(e) => {
                tracing::info!(path = %path.display(), error = %e, "Configuration artifact not usable");
                result.needs_fresh_config = true;
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{sample_config, write_artifact};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_empty_directory_is_ground_state() {
        let dir = tempfile::tempdir().unwrap();
        let result = inspect(dir.path()).await;
        assert_eq!(result, InspectionResult::ground());
    }

    #[tokio::test]
    async fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().join("nested").join("run");
        let result = inspect(&work_dir).await;
        assert_eq!(result.next_stage, ExecutionStage::SiteAnalysis);
        assert!(work_dir.is_dir());
    }

    #[tokio::test]
    async fn test_analysis_only_needs_fresh_config() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), ArtifactKind::Analysis, "# Site").await.unwrap();

        let result = inspect(dir.path()).await;
        assert_eq!(result.next_stage, ExecutionStage::ScenarioGeneration);
        assert!(result.needs_fresh_config);
        assert!(!result.config_usable);
        assert_eq!(result.existing_artifacts, vec![ArtifactKind::Analysis]);
    }

    #[tokio::test]
    async fn test_stats_success_resumes_at_calibration() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), ArtifactKind::TestCases, "# Cases").await.unwrap();
        write_artifact(
            dir.path(),
            ArtifactKind::ExecutionResults,
            r#"{"stats":{"expected":5,"unexpected":0}}"#,
        )
        .await
        .unwrap();

        let result = inspect(dir.path()).await;
        assert_eq!(result.next_stage, ExecutionStage::Calibration);
        assert!(!result.needs_fresh_config);
    }

    #[tokio::test]
    async fn test_all_result_shapes_agree() {
        let success = [
            r#"{"success":true}"#,
            r#"{"stats":{"expected":2,"unexpected":0}}"#,
            r#"{"suites":[{"title":"a","specs":[{"title":"b","tests":[{"status":"expected"}]}]}]}"#,
        ];
        let failure = [
            r#"{"success":false}"#,
            r#"{"stats":{"expected":2,"unexpected":1}}"#,
            r#"{"suites":[{"title":"a","specs":[{"title":"b","tests":[{"status":"unexpected"}]}]}]}"#,
        ];

        for (contents, expected) in success
            .iter()
            .map(|c| (c, ExecutionStage::Calibration))
            .chain(failure.iter().map(|c| (c, ExecutionStage::Execution)))
        {
            let dir = tempfile::tempdir().unwrap();
            write_artifact(dir.path(), ArtifactKind::TestCases, "# Cases").await.unwrap();
            write_artifact(dir.path(), ArtifactKind::ExecutionResults, contents).await.unwrap();
            assert_eq!(inspect(dir.path()).await.next_stage, expected, "{contents}");
        }
    }

    #[tokio::test]
    async fn test_usable_config_flips_needs_fresh_config() {
        let dir = tempfile::tempdir().unwrap();
        sample_config(dir.path()).save(dir.path()).await.unwrap();

        let result = inspect(dir.path()).await;
        assert_eq!(result.next_stage, ExecutionStage::SiteAnalysis);
        assert!(result.config_usable);
        assert!(!result.needs_fresh_config);
        assert_eq!(result.config_path, Some(dir.path().join("config.json")));
    }

    #[tokio::test]
    async fn test_insufficient_config_for_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), ArtifactKind::Analysis, "# Site").await.unwrap();
        PipelineConfig::new("https://example.com", dir.path())
            .save(dir.path())
            .await
            .unwrap();

        let result = inspect(dir.path()).await;
        assert_eq!(result.next_stage, ExecutionStage::ScenarioGeneration);
        assert!(!result.config_usable);
        assert!(result.needs_fresh_config);
    }

    #[tokio::test]
    async fn test_malformed_config_forces_fresh_config_on_later_stage() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), ArtifactKind::TestCases, "# Cases").await.unwrap();
        write_artifact(dir.path(), ArtifactKind::Config, "{ broken").await.unwrap();

        let result = inspect(dir.path()).await;
        assert_eq!(result.next_stage, ExecutionStage::Execution);
        assert!(result.needs_fresh_config);
    }

    #[tokio::test]
    async fn test_work_dir_is_a_file_falls_back_to_ground() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();

        let result = inspect(&file).await;
        assert_eq!(result, InspectionResult::ground());
    }
}
