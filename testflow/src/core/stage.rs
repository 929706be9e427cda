//! The five ordered execution stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stage of the test-generation workflow.
///
/// Stages are totally ordered by their ordinal; a run only ever moves
/// forward through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStage {
    /// Crawl and describe the target site.
    SiteAnalysis = 1,
    /// Design test scenarios from the analysis and the requirements.
    ScenarioGeneration = 2,
    /// Author concrete test cases for the scenarios.
    CaseGeneration = 3,
    /// Run the test cases through the browser automation tool.
    Execution = 4,
    /// Calibrate the cases against the execution results.
    Calibration = 5,
}

impl ExecutionStage {
    /// All stages in execution order.
    pub const ALL: [Self; 5] = [
        Self::SiteAnalysis,
        Self::ScenarioGeneration,
        Self::CaseGeneration,
        Self::Execution,
        Self::Calibration,
    ];

    /// Number of stages in a full run.
    pub const COUNT: u8 = 5;

    /// Returns the 1-based ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Looks a stage up by its 1-based ordinal.
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|stage| stage.ordinal() == ordinal)
    }

    /// Stages 1-3 must succeed for a run to continue.
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        matches!(
            self,
            Self::SiteAnalysis | Self::ScenarioGeneration | Self::CaseGeneration
        )
    }

    /// Stages 1 and 2 consume user intent rather than upstream artifacts.
    #[must_use]
    pub const fn needs_user_intent(self) -> bool {
        matches!(self, Self::SiteAnalysis | Self::ScenarioGeneration)
    }

    /// Short machine-friendly name.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::SiteAnalysis => "site_analysis",
            Self::ScenarioGeneration => "scenario_generation",
            Self::CaseGeneration => "case_generation",
            Self::Execution => "execution",
            Self::Calibration => "calibration",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SiteAnalysis => "Site analysis",
            Self::ScenarioGeneration => "Scenario generation",
            Self::CaseGeneration => "Case generation",
            Self::Execution => "Execution",
            Self::Calibration => "Calibration",
        }
    }

    /// One-line description shown to UI consumers.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SiteAnalysis => "Exploring the target site and recording its structure",
            Self::ScenarioGeneration => "Designing test scenarios from the requirements",
            Self::CaseGeneration => "Writing executable test cases for each scenario",
            Self::Execution => "Running the test cases in a real browser",
            Self::Calibration => "Reconciling the test cases with the observed results",
        }
    }
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.ordinal(), self.name())
    }
}

impl FromStr for ExecutionStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        if let Ok(ordinal) = needle.parse::<u8>() {
            return Self::from_ordinal(ordinal)
                .ok_or_else(|| format!("stage ordinal must be 1-{}, got {ordinal}", Self::COUNT));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|stage| {
                stage.slug() == needle
                    || stage.slug().split('_').next() == Some(needle.as_str())
            })
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}
