//! Reading the execution-result artifact.
//!
//! Three shapes are accepted:
//! 1. `{ "success": bool }`
//! 2. `{ "stats": { "expected": n, "unexpected": m } }`, success iff
//!    `m == 0 && n > 0`
//! 3. `{ "suites": [...] }`, a nested suite/spec/test tree; success iff the
//!    flattened test list is non-empty and every status is `"expected"`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Status a passing test carries in the nested result tree.
pub const EXPECTED_STATUS: &str = "expected";

/// What the execution-result artifact says about the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultVerdict {
    /// No execution-result artifact.
    #[default]
    Absent,
    /// The artifact parses and reports success.
    Passed,
    /// The artifact parses and reports failure.
    Failed,
    /// The artifact exists but matches no accepted shape.
    Unreadable,
}

impl ResultVerdict {
    /// Every verdict, for state-space enumeration.
    pub const ALL: [Self; 4] = [Self::Absent, Self::Passed, Self::Failed, Self::Unreadable];

    /// Returns true if the artifact exists on disk.
    #[must_use]
    pub const fn is_present(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// A single test flattened out of the nested result tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEntry {
    /// Spec title, prefixed with its enclosing suite titles.
    pub name: String,
    /// Raw status string.
    pub status: String,
}

/// Evaluates the contents of an execution-result artifact.
#[must_use]
pub fn evaluate_results(contents: &str) -> ResultVerdict {
    let Ok(value) = serde_json::from_str::<Value>(contents) else {
        return ResultVerdict::Unreadable;
    };
    match reported_success(&value) {
        Some(true) => ResultVerdict::Passed,
        Some(false) => ResultVerdict::Failed,
        None => ResultVerdict::Unreadable,
    }
}

/// Reads and evaluates the execution-result artifact at `path`.
pub async fn read_verdict(path: &Path) -> ResultVerdict {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => evaluate_results(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ResultVerdict::Absent,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Execution results unreadable");
            ResultVerdict::Unreadable
        }
    }
}

fn reported_success(value: &Value) -> Option<bool> {
    if let Some(success) = value.get("success").and_then(Value::as_bool) {
        return Some(success);
    }

    if let Some(stats) = value.get("stats").filter(|s| s.is_object()) {
        let expected = stats.get("expected").and_then(Value::as_u64).unwrap_or(0);
        let unexpected = stats.get("unexpected").and_then(Value::as_u64).unwrap_or(0);
        return Some(unexpected == 0 && expected > 0);
    }

    if let Some(suites) = value.get("suites").and_then(Value::as_array) {
        let tests = flatten_tests(suites);
        return Some(!tests.is_empty() && tests.iter().all(|t| t.status == EXPECTED_STATUS));
    }

    None
}

/// Flattens a nested suite/spec/test tree into `{name, status}` pairs.
///
/// Suites may nest other suites; each spec contributes one entry per test
/// run. A spec without any test runs contributes nothing.
#[must_use]
pub fn flatten_tests(suites: &[Value]) -> Vec<TestEntry> {
    let mut entries = Vec::new();
    for suite in suites {
        collect_suite(suite, "", &mut entries);
    }
    entries
}

fn collect_suite(suite: &Value, prefix: &str, out: &mut Vec<TestEntry>) {
    let title = suite.get("title").and_then(Value::as_str).unwrap_or_default();
    let path = join_title(prefix, title);

    for spec in suite.get("specs").and_then(Value::as_array).into_iter().flatten() {
        let name = join_title(&path, spec.get("title").and_then(Value::as_str).unwrap_or_default());
        for test in spec.get("tests").and_then(Value::as_array).into_iter().flatten() {
            let status = test
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            out.push(TestEntry {
                name: name.clone(),
                status,
            });
        }
    }

    for child in suite.get("suites").and_then(Value::as_array).into_iter().flatten() {
        collect_suite(child, &path, out);
    }
}

fn join_title(prefix: &str, title: &str) -> String {
    match (prefix.is_empty(), title.is_empty()) {
        (true, _) => title.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix} > {title}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn nested(statuses: &[&str]) -> String {
        let tests: Vec<_> = statuses.iter().map(|s| json!({"status": s})).collect();
        json!({
            "suites": [{
                "title": "checkout.spec.ts",
                "specs": [],
                "suites": [{
                    "title": "Checkout",
                    "specs": [{"title": "pays with card", "tests": tests}]
                }]
            }]
        })
        .to_string()
    }

    #[test]
    fn test_explicit_success_shape() {
        assert_eq!(evaluate_results(r#"{"success": true}"#), ResultVerdict::Passed);
        assert_eq!(evaluate_results(r#"{"success": false}"#), ResultVerdict::Failed);
    }

    #[test]
    fn test_stats_shape() {
        assert_eq!(
            evaluate_results(r#"{"stats":{"expected":5,"unexpected":0}}"#),
            ResultVerdict::Passed
        );
        assert_eq!(
            evaluate_results(r#"{"stats":{"expected":5,"unexpected":1}}"#),
            ResultVerdict::Failed
        );
        assert_eq!(
            evaluate_results(r#"{"stats":{"expected":0,"unexpected":0}}"#),
            ResultVerdict::Failed
        );
    }

    #[test]
    fn test_suites_shape() {
        assert_eq!(evaluate_results(&nested(&["expected", "expected"])), ResultVerdict::Passed);
        assert_eq!(evaluate_results(&nested(&["expected", "unexpected"])), ResultVerdict::Failed);
        assert_eq!(evaluate_results(&nested(&[])), ResultVerdict::Failed);
    }

    #[test]
    fn test_unreadable() {
        assert_eq!(evaluate_results("not json"), ResultVerdict::Unreadable);
        assert_eq!(evaluate_results(r#"{"passed": 3}"#), ResultVerdict::Unreadable);
        assert_eq!(evaluate_results("[]"), ResultVerdict::Unreadable);
    }

    #[test]
    fn test_flatten_names_include_suite_path() {
        let value: Value = serde_json::from_str(&nested(&["expected", "flaky"])).unwrap();
        let suites = value["suites"].as_array().unwrap();
        let entries = flatten_tests(suites);
        assert_eq!(
            entries,
            vec![
                TestEntry {
                    name: "checkout.spec.ts > Checkout > pays with card".to_string(),
                    status: "expected".to_string(),
                },
                TestEntry {
                    name: "checkout.spec.ts > Checkout > pays with card".to_string(),
                    status: "flaky".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_verdict_absent() {
        let dir = tempfile::tempdir().unwrap();
        let verdict = read_verdict(&dir.path().join("test_results.json")).await;
        assert_eq!(verdict, ResultVerdict::Absent);
    }
}
