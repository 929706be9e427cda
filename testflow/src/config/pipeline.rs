//! The per-run pipeline configuration and its artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::core::{ArtifactKind, ExecutionStage};
use crate::errors::{ConfigError, TestflowError};

/// Relative importance the agent should give generated cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Cover critical paths only.
    High,
    /// Balanced coverage.
    #[default]
    Medium,
    /// Include edge cases and cosmetic checks.
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority '{other}' (expected high, medium or low)")),
        }
    }
}

/// Configuration for one pipeline run.
///
/// Created once per run and read-only afterwards. Persisted as camelCase
/// JSON in the configuration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// The site under test.
    #[serde(default)]
    pub target_url: String,
    /// Display name for the site.
    #[serde(default)]
    pub site_name: String,
    /// Free-text requirements the scenarios must cover.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Kinds of tests to generate (e.g. "functional", "accessibility").
    #[serde(default)]
    pub test_types: Vec<String>,
    /// Upper bound on generated test cases.
    #[serde(default = "default_max_cases")]
    pub max_cases: u32,
    /// Case priority.
    #[serde(default)]
    pub priority: Priority,
    /// Per-step timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Working directory holding the checkpoint artifacts.
    #[serde(default)]
    pub work_dir: PathBuf,
    /// Verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_cases() -> u32 {
    10
}

fn default_timeout_ms() -> u64 {
    10 * 60 * 1000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            site_name: String::new(),
            requirements: Vec::new(),
            test_types: Vec::new(),
            max_cases: default_max_cases(),
            priority: Priority::default(),
            timeout_ms: default_timeout_ms(),
            work_dir: PathBuf::new(),
            verbose: false,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for a target site.
    #[must_use]
    pub fn new(target_url: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_url: target_url.into(),
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the site name.
    #[must_use]
    pub fn with_site_name(mut self, name: impl Into<String>) -> Self {
        self.site_name = name.into();
        self
    }

    /// Adds a requirement.
    #[must_use]
    pub fn with_requirement(mut self, requirement: impl Into<String>) -> Self {
        self.requirements.push(requirement.into());
        self
    }

    /// Adds a test type.
    #[must_use]
    pub fn with_test_type(mut self, test_type: impl Into<String>) -> Self {
        self.test_types.push(test_type.into());
        self
    }

    /// Sets the per-step timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Per-step timeout as a `Duration`.
    #[must_use]
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks the fields the given stage needs.
    ///
    /// Site analysis needs a target URL; scenario generation additionally
    /// needs requirements and test types. Later stages work from upstream
    /// artifacts alone.
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid field.
    pub fn validate_for(&self, stage: ExecutionStage) -> Result<(), ConfigError> {
        if !stage.needs_user_intent() {
            return Ok(());
        }

        let url = self.target_url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "targetUrl",
                stage,
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidField {
                field: "targetUrl",
                reason: format!("'{url}' is not an http(s) URL"),
            });
        }

        if stage == ExecutionStage::ScenarioGeneration {
            if self.requirements.iter().all(|r| r.trim().is_empty()) {
                return Err(ConfigError::MissingField {
                    field: "requirements",
                    stage,
                });
            }
            if self.test_types.iter().all(|t| t.trim().is_empty()) {
                return Err(ConfigError::MissingField {
                    field: "testTypes",
                    stage,
                });
            }
        }

        Ok(())
    }

    /// Reads a configuration artifact.
    ///
    /// An empty `workDir` is filled in with the artifact's directory.
    ///
    /// # Errors
    ///
    /// Returns `Unreadable` or `Malformed` when the file cannot be used.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        if config.work_dir.as_os_str().is_empty() {
            if let Some(parent) = path.parent() {
                config.work_dir = parent.to_path_buf();
            }
        }
        Ok(config)
    }

    /// Writes the configuration artifact into `work_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, work_dir: &Path) -> Result<PathBuf, TestflowError> {
        tokio::fs::create_dir_all(work_dir).await?;
        let path = ArtifactKind::Config.path_in(work_dir);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn full_config() -> PipelineConfig {
        PipelineConfig::new("https://shop.example.com", "/tmp/run")
            .with_site_name("Shop")
            .with_requirement("checkout works")
            .with_test_type("functional")
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_cases, 10);
        assert_eq!(config.priority, Priority::Medium);
        assert_eq!(config.step_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_site_analysis_needs_only_url() {
        let config = PipelineConfig::new("https://example.com", "/tmp/run");
        assert!(config.validate_for(ExecutionStage::SiteAnalysis).is_ok());
        assert!(matches!(
            config.validate_for(ExecutionStage::ScenarioGeneration),
            Err(ConfigError::MissingField { field: "requirements", .. })
        ));
    }

    #[test]
    fn test_scenario_generation_needs_test_types() {
        let config = PipelineConfig::new("https://example.com", "/tmp/run")
            .with_requirement("login");
        assert!(matches!(
            config.validate_for(ExecutionStage::ScenarioGeneration),
            Err(ConfigError::MissingField { field: "testTypes", .. })
        ));
        assert!(full_config().validate_for(ExecutionStage::ScenarioGeneration).is_ok());
    }

    #[test]
    fn test_later_stages_need_nothing() {
        let empty = PipelineConfig::default();
        for stage in [
            ExecutionStage::CaseGeneration,
            ExecutionStage::Execution,
            ExecutionStage::Calibration,
        ] {
            assert!(empty.validate_for(stage).is_ok());
        }
    }

    #[test]
    fn test_rejects_non_http_url() {
        let config = PipelineConfig::new("ftp://example.com", "/tmp/run");
        assert!(matches!(
            config.validate_for(ExecutionStage::SiteAnalysis),
            Err(ConfigError::InvalidField { field: "targetUrl", .. })
        ));
    }

    #[test]
    fn test_camel_case_round_trip_fields() {
        let json = serde_json::json!({
            "targetUrl": "https://example.com",
            "siteName": "Example",
            "requirements": ["search"],
            "testTypes": ["functional"],
            "maxCases": 3,
            "priority": "high",
            "timeoutMs": 1000
        });
        let config: PipelineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.max_cases, 3);
        assert_eq!(config.priority, Priority::High);
        assert_eq!(config.timeout_ms, 1000);
        assert!(!config.verbose);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = full_config();
        config.work_dir = PathBuf::new();

        let path = config.save(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("config.json"));

        let loaded = PipelineConfig::load(&path).await.unwrap();
        assert_eq!(loaded.target_url, config.target_url);
        assert_eq!(loaded.work_dir, dir.path());
    }

    #[tokio::test]
    async fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = PipelineConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
