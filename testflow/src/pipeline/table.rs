//! The static stage table: upstream inputs and output per stage.

use std::path::{Path, PathBuf};

use crate::core::{ArtifactKind, ExecutionStage};

/// What one stage consumes and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSpec {
    /// The stage.
    pub stage: ExecutionStage,
    /// Artifacts that must exist before the stage can run.
    pub inputs: &'static [ArtifactKind],
    /// The artifact the stage writes.
    pub output: ArtifactKind,
}

/// Every stage in execution order.
pub static STAGE_TABLE: [StageSpec; 5] = [
    StageSpec {
        stage: ExecutionStage::SiteAnalysis,
        inputs: &[],
        output: ArtifactKind::Analysis,
    },
    StageSpec {
        stage: ExecutionStage::ScenarioGeneration,
        inputs: &[ArtifactKind::Analysis],
        output: ArtifactKind::Scenarios,
    },
    StageSpec {
        stage: ExecutionStage::CaseGeneration,
        inputs: &[ArtifactKind::Scenarios],
        output: ArtifactKind::TestCases,
    },
    StageSpec {
        stage: ExecutionStage::Execution,
        inputs: &[ArtifactKind::TestCases],
        output: ArtifactKind::ExecutionResults,
    },
    StageSpec {
        stage: ExecutionStage::Calibration,
        inputs: &[ArtifactKind::TestCases, ArtifactKind::ExecutionResults],
        output: ArtifactKind::Calibration,
    },
];

impl StageSpec {
    /// Looks up a stage's row.
    #[must_use]
    pub fn for_stage(stage: ExecutionStage) -> &'static Self {
        &STAGE_TABLE[usize::from(stage.ordinal()) - 1]
    }

    /// Upstream artifact paths inside `work_dir`.
    #[must_use]
    pub fn input_paths(&self, work_dir: &Path) -> Vec<(ArtifactKind, PathBuf)> {
        self.inputs
            .iter()
            .map(|kind| (*kind, kind.path_in(work_dir)))
            .collect()
    }

    /// Output artifact path inside `work_dir`.
    #[must_use]
    pub fn output_path(&self, work_dir: &Path) -> PathBuf {
        self.output.path_in(work_dir)
    }
}
