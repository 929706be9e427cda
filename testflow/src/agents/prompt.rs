//! Stage briefs handed to the external agent.

use std::fmt::Write as _;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::core::{ArtifactKind, ExecutionStage};

/// Builds the brief for one stage, followed by its upstream artifacts.
#[must_use]
pub fn stage_brief(
    stage: ExecutionStage,
    config: &PipelineConfig,
    inputs: &[(impl AsRef<Path>, String)],
) -> String {
    let mut brief = String::new();
    let output = ArtifactKind::output_of(stage);

    let _ = writeln!(brief, "# {}", stage.name());
    let _ = writeln!(brief, "{}.", stage.description());
    let _ = writeln!(brief);

    if !config.target_url.is_empty() {
        let _ = writeln!(brief, "Target: {}", config.target_url);
    }
    if !config.site_name.is_empty() {
        let _ = writeln!(brief, "Site name: {}", config.site_name);
    }

    match stage {
        ExecutionStage::SiteAnalysis => {}
        ExecutionStage::ScenarioGeneration => {
            let _ = writeln!(brief, "Requirements:");
            for requirement in &config.requirements {
                let _ = writeln!(brief, "- {requirement}");
            }
            let _ = writeln!(brief, "Test types: {}", config.test_types.join(", "));
        }
        ExecutionStage::CaseGeneration => {
            let _ = writeln!(
                brief,
                "Write at most {} cases, priority {}.",
                config.max_cases, config.priority
            );
        }
        ExecutionStage::Execution => {
            let _ = writeln!(
                brief,
                "Reply with a JSON report containing either \"success\", \"stats\" or \"suites\"."
            );
        }
        ExecutionStage::Calibration => {
            let _ = writeln!(brief, "Explain each unexpected result and propose case fixes.");
        }
    }

    let _ = writeln!(brief, "Your reply is saved verbatim as {output}.");

    for (path, contents) in inputs {
        let name = path
            .as_ref()
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let _ = write!(brief, "\n--- {name} ---\n{contents}\n");
    }

    brief
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_brief_includes_requirements_and_inputs() {
        let config = PipelineConfig::new("https://shop.example.com", "/tmp/run")
            .with_requirement("guest checkout")
            .with_test_type("functional");
        let inputs = vec![(PathBuf::from("/tmp/run/site_analysis.md"), "# Shop".to_string())];

        let brief = stage_brief(ExecutionStage::ScenarioGeneration, &config, &inputs);

        assert!(brief.starts_with("# Scenario generation"));
        assert!(brief.contains("- guest checkout"));
        assert!(brief.contains("test_scenarios.md"));
        assert!(brief.contains("--- site_analysis.md ---\n# Shop"));
    }

    #[test]
    fn test_execution_brief_asks_for_json() {
        let inputs: Vec<(PathBuf, String)> = Vec::new();
        let brief = stage_brief(ExecutionStage::Execution, &PipelineConfig::default(), &inputs);
        assert!(brief.contains("test_results.json"));
        assert!(brief.contains("\"stats\""));
    }
}
