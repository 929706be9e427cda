//! Usage-limit classification for heterogeneous failures.
//!
//! One classifier and one phrase catalog are shared by every layer that
//! needs to tell provider throttling apart from real defects: the agent
//! step around its external call, the controller's per-stage failure
//! handler, and the process entry point.
//!
//! Matching is best-effort. A provider that rewords its throttling message
//! produces a false negative until the catalog is updated.

use serde::Serialize;
use std::error::Error as StdError;

use crate::errors::{AgentError, USAGE_LIMIT_CODE};

/// Lower-case phrases that identify provider throttling.
pub const DEFAULT_USAGE_LIMIT_PHRASES: &[&str] = &[
    "usage limit reached",
    "usage limit exceeded",
    "rate limit",
    "rate_limit",
    "quota exceeded",
    "exceeded your current quota",
    "monthly limit",
    "too many requests",
    "credit balance is too low",
    "claude code process exited with code 1",
];

/// The classifier's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimitSignal {
    /// True when the failure looks like provider throttling.
    pub is_usage_limit: bool,
}

impl UsageLimitSignal {
    const HIT: Self = Self { is_usage_limit: true };
    const MISS: Self = Self { is_usage_limit: false };
}

/// Heuristic classifier distinguishing throttling from genuine errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageLimitClassifier {
    phrases: Vec<String>,
}

impl Default for UsageLimitClassifier {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_USAGE_LIMIT_PHRASES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl UsageLimitClassifier {
    /// Creates a classifier with the default catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the catalog with another phrase.
    #[must_use]
    pub fn with_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into().to_lowercase());
        self
    }

    /// Returns the active phrase catalog.
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Classifies free text.
    #[must_use]
    pub fn classify_text(&self, text: &str) -> UsageLimitSignal {
        if self.matches(text) {
            UsageLimitSignal::HIT
        } else {
            UsageLimitSignal::MISS
        }
    }

    /// Classifies an error and everything in its `source()` chain.
    #[must_use]
    pub fn classify_error(&self, err: &(dyn StdError + 'static)) -> UsageLimitSignal {
        let chain = std::iter::successors(Some(err), |e| (*e).source());
        self.classify_chain(chain, &format!("{err:?}"))
    }

    /// Classifies an `anyhow` error, including its context chain.
    #[must_use]
    pub fn classify_anyhow(&self, err: &anyhow::Error) -> UsageLimitSignal {
        self.classify_chain(err.chain(), &format!("{err:#}"))
    }

    /// Classifies an arbitrary JSON value (e.g. an error object an agent printed).
    #[must_use]
    pub fn classify_value(&self, value: &serde_json::Value) -> UsageLimitSignal {
        if let Some(object) = value.as_object() {
            if object.get("code").and_then(serde_json::Value::as_str) == Some(USAGE_LIMIT_CODE) {
                return UsageLimitSignal::HIT;
            }
            let not_retryable = ["isRetryable", "retryable"]
                .iter()
                .any(|key| object.get(*key).and_then(serde_json::Value::as_bool) == Some(false));
            if not_retryable {
                return UsageLimitSignal::HIT;
            }
            if let Some(message) = object.get("message").and_then(serde_json::Value::as_str) {
                if self.matches(message) {
                    return UsageLimitSignal::HIT;
                }
            }
        }

        let representation = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.classify_text(&representation)
    }

    fn classify_chain<'a>(
        &self,
        chain: impl Iterator<Item = &'a (dyn StdError + 'static)>,
        representation: &str,
    ) -> UsageLimitSignal {
        let mut messages = Vec::new();
        for link in chain {
            if let Some(agent) = link.downcast_ref::<AgentError>() {
                if agent.has_usage_limit_marker() {
                    return UsageLimitSignal::HIT;
                }
            }
            messages.push(link.to_string());
        }

        if messages.iter().any(|m| self.matches(m)) || self.matches(representation) {
            UsageLimitSignal::HIT
        } else {
            UsageLimitSignal::MISS
        }
    }

    fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.phrases.iter().any(|phrase| lowered.contains(phrase.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use serde_json::json;

    #[test]
    fn test_structured_code_value() {
        let classifier = UsageLimitClassifier::new();
        assert!(classifier.classify_value(&json!({"code": "USAGE_LIMIT_REACHED"})).is_usage_limit);
    }

    #[test]
    fn test_non_retryable_flag_value() {
        let classifier = UsageLimitClassifier::new();
        assert!(classifier.classify_value(&json!({"isRetryable": false})).is_usage_limit);
        assert!(!classifier.classify_value(&json!({"isRetryable": true})).is_usage_limit);
    }

    #[test]
    fn test_rate_limit_message() {
        let classifier = UsageLimitClassifier::new();
        let err = anyhow::anyhow!("Rate limit exceeded, please retry later");
        assert!(classifier.classify_anyhow(&err).is_usage_limit);
    }

    #[test]
    fn test_file_not_found_is_not_usage_limit() {
        let classifier = UsageLimitClassifier::new();
        let err = anyhow::anyhow!("file not found");
        assert!(!classifier.classify_anyhow(&err).is_usage_limit);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(!classifier.classify_error(&io).is_usage_limit);
    }

    #[test]
    fn test_structured_marker_deep_in_chain() {
        let classifier = UsageLimitClassifier::new();
        let err = anyhow::Error::new(AgentError::usage_limit("agent stopped"))
            .context("scenario generation failed");
        assert!(classifier.classify_anyhow(&err).is_usage_limit);
    }

    #[test]
    fn test_classify_error_walks_sources() {
        #[derive(Debug, thiserror::Error)]
        #[error("stage failed")]
        struct Wrapper(#[source] AgentError);

        let classifier = UsageLimitClassifier::new();
        let throttled = Wrapper(AgentError::new("stopped").with_retryable(false));
        assert!(classifier.classify_error(&throttled).is_usage_limit);

        let plain = Wrapper(AgentError::new("selector missing"));
        assert!(!classifier.classify_error(&plain).is_usage_limit);
    }

    #[test]
    fn test_phrase_in_context_layer() {
        let classifier = UsageLimitClassifier::new();
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "exit status 1"));
        let err = result.context("Monthly limit hit for this workspace").unwrap_err();
        assert!(classifier.classify_anyhow(&err).is_usage_limit);
    }

    #[test]
    fn test_plain_string_value() {
        let classifier = UsageLimitClassifier::new();
        assert!(classifier.classify_value(&json!("429 Too Many Requests")).is_usage_limit);
        assert!(!classifier.classify_value(&json!(42)).is_usage_limit);
    }

    #[test]
    fn test_custom_phrase() {
        let classifier = UsageLimitClassifier::new().with_phrase("Capacity Exhausted");
        assert!(classifier.classify_text("upstream capacity exhausted").is_usage_limit);
        assert!(!UsageLimitClassifier::new()
            .classify_text("upstream capacity exhausted")
            .is_usage_limit);
    }
}
