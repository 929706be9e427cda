//! Well-known checkpoint artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::ExecutionStage;

/// One of the six checkpoint files a working directory can hold.
///
/// The file names are the resumability contract: the inspector perceives
/// progress only through them, so renaming one breaks resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Output of site analysis.
    Analysis,
    /// Output of scenario generation.
    Scenarios,
    /// Output of case generation.
    TestCases,
    /// Output of execution (JSON).
    ExecutionResults,
    /// Output of calibration.
    Calibration,
    /// Persisted pipeline configuration (JSON).
    Config,
}

impl ArtifactKind {
    /// All artifacts, stage outputs first, configuration last.
    pub const ALL: [Self; 6] = [
        Self::Analysis,
        Self::Scenarios,
        Self::TestCases,
        Self::ExecutionResults,
        Self::Calibration,
        Self::Config,
    ];

    /// The exact, case-sensitive file name relative to the working directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Analysis => "site_analysis.md",
            Self::Scenarios => "test_scenarios.md",
            Self::TestCases => "test_cases.md",
            Self::ExecutionResults => "test_results.json",
            Self::Calibration => "calibration_report.md",
            Self::Config => "config.json",
        }
    }

    /// Resolves the artifact inside `work_dir`.
    #[must_use]
    pub fn path_in(self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.file_name())
    }

    /// The stage whose output this artifact is. `None` for the configuration.
    #[must_use]
    pub const fn producer(self) -> Option<ExecutionStage> {
        match self {
            Self::Analysis => Some(ExecutionStage::SiteAnalysis),
            Self::Scenarios => Some(ExecutionStage::ScenarioGeneration),
            Self::TestCases => Some(ExecutionStage::CaseGeneration),
            Self::ExecutionResults => Some(ExecutionStage::Execution),
            Self::Calibration => Some(ExecutionStage::Calibration),
            Self::Config => None,
        }
    }

    /// The artifact a stage produces.
    #[must_use]
    pub const fn output_of(stage: ExecutionStage) -> Self {
        match stage {
            ExecutionStage::SiteAnalysis => Self::Analysis,
            ExecutionStage::ScenarioGeneration => Self::Scenarios,
            ExecutionStage::CaseGeneration => Self::TestCases,
            ExecutionStage::Execution => Self::ExecutionResults,
            ExecutionStage::Calibration => Self::Calibration,
        }
    }

    /// Content kind reported to UI consumers.
    #[must_use]
    pub const fn content_kind(self) -> &'static str {
        match self {
            Self::ExecutionResults | Self::Config => "json",
            _ => "markdown",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
