//! The checkpoint state machine.
//!
//! A working directory's progress is fully described by which stage
//! artifacts exist plus what the execution results say. [`CheckpointState`]
//! is that tuple, and [`CheckpointState::next_stage`] is a total function
//! over it, so the whole state space can be enumerated.

use serde::{Deserialize, Serialize};

use super::results::ResultVerdict;
use crate::core::ExecutionStage;

/// Presence of each stage artifact in a working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CheckpointState {
    /// `site_analysis.md` exists.
    pub analysis: bool,
    /// `test_scenarios.md` exists.
    pub scenarios: bool,
    /// `test_cases.md` exists.
    pub test_cases: bool,
    /// What `test_results.json` reports.
    pub results: ResultVerdict,
    /// `calibration_report.md` exists.
    pub calibration: bool,
}

impl CheckpointState {
    /// The empty working directory.
    pub const GROUND: Self = Self {
        analysis: false,
        scenarios: false,
        test_cases: false,
        results: ResultVerdict::Absent,
        calibration: false,
    };

    /// The next unresolved stage. The most advanced artifact wins.
    #[must_use]
    pub const fn next_stage(&self) -> ExecutionStage {
        if self.calibration {
            return ExecutionStage::Calibration;
        }
        match self.results {
            ResultVerdict::Passed => return ExecutionStage::Calibration,
            ResultVerdict::Failed | ResultVerdict::Unreadable => return ExecutionStage::Execution,
            ResultVerdict::Absent => {}
        }
        if self.test_cases {
            ExecutionStage::Execution
        } else if self.scenarios {
            ExecutionStage::CaseGeneration
        } else if self.analysis {
            ExecutionStage::ScenarioGeneration
        } else {
            ExecutionStage::SiteAnalysis
        }
    }

    /// Human-readable reason for [`next_stage`](Self::next_stage).
    #[must_use]
    pub const fn rationale(&self) -> &'static str {
        if self.calibration {
            return "calibration report exists; calibration can be re-run";
        }
        match self.results {
            ResultVerdict::Passed => {
                return "execution results report success; calibration is next"
            }
            ResultVerdict::Failed => {
                return "execution results report failures; delete test_results.json to re-run"
            }
            ResultVerdict::Unreadable => {
                return "execution results cannot be parsed; delete test_results.json to re-run"
            }
            ResultVerdict::Absent => {}
        }
        if self.test_cases {
            "test cases exist; execution is next"
        } else if self.scenarios {
            "scenarios exist; case generation is next"
        } else if self.analysis {
            "site analysis exists; scenario generation is next"
        } else {
            "no checkpoint artifacts; starting from site analysis"
        }
    }

    /// Every reachable combination of artifacts.
    pub fn all() -> impl Iterator<Item = Self> {
        (0u8..16).flat_map(|bits| {
            ResultVerdict::ALL.into_iter().map(move |results| Self {
                analysis: bits & 1 != 0,
                scenarios: bits & 2 != 0,
                test_cases: bits & 4 != 0,
                results,
                calibration: bits & 8 != 0,
            })
        })
    }

    /// States reachable by adding one more artifact to this one.
    pub fn successors(&self) -> Vec<Self> {
        let mut next = Vec::new();
        if !self.analysis {
            next.push(Self { analysis: true, ..*self });
        }
        if !self.scenarios {
            next.push(Self { scenarios: true, ..*self });
        }
        if !self.test_cases {
            next.push(Self { test_cases: true, ..*self });
        }
        if !self.results.is_present() {
            for results in [ResultVerdict::Passed, ResultVerdict::Failed, ResultVerdict::Unreadable] {
                next.push(Self { results, ..*self });
            }
        }
        if !self.calibration {
            next.push(Self { calibration: true, ..*self });
        }
        next
    }
}
