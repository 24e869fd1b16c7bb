//! Validation engine - orchestrates schema checking, detectors and scoring

use super::registry::{default_registry, Detector, Registry, RegistryError};
use super::scoring::{compute_score, penalty_total};
use crate::config::GuardConfig;
use crate::validator::{JsonSchemaValidator, SchemaValidator};
use crate::{GuardReport, Issue, IssueKind, ReportMeta, Severity};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GuardError {
    /// The output could not be turned into JSON for analysis
    #[error("output could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Main validation engine: a detector registry plus a schema validator
pub struct GuardEngine {
    registry: Registry,
    schema_validator: Box<dyn SchemaValidator>,
}

impl GuardEngine {
    /// Engine with every built-in detector and the `jsonschema` validator
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    /// Engine running exactly the detectors in `registry`
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            schema_validator: Box::new(JsonSchemaValidator),
        }
    }

    /// Replace the schema validator
    pub fn with_schema_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.schema_validator = Box::new(validator);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Add a detector after the built-in ones
    pub fn register(
        &mut self,
        name: impl Into<String>,
        detector: impl Detector + 'static,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, detector)
    }

    /// Validate one output.
    ///
    /// Strings are analyzed as-is; any other value is analyzed as its compact
    /// JSON text. When the config carries a schema and the output is
    /// object-like, schema errors come first as high-severity issues.
    pub fn validate(&self, output: &Value, config: &GuardConfig) -> Result<GuardReport, GuardError> {
        let mut issues = self.schema_issues(output, config);

        let text: Cow<'_, str> = match output {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(serde_json::to_string(other)?),
        };
        issues.extend(self.registry.run_all(&text, config));

        Ok(self.build_report(issues, config, input_type(output)))
    }

    /// Validate any serializable output
    pub fn validate_serializable<T: Serialize + ?Sized>(
        &self,
        output: &T,
        config: &GuardConfig,
    ) -> Result<GuardReport, GuardError> {
        let value = serde_json::to_value(output)?;
        self.validate(&value, config)
    }

    /// Validate plain text. Text always serializes, so this cannot fail.
    pub fn validate_text(&self, text: &str, config: &GuardConfig) -> GuardReport {
        let issues = self.registry.run_all(text, config);
        self.build_report(issues, config, "string")
    }

    fn schema_issues(&self, output: &Value, config: &GuardConfig) -> Vec<Issue> {
        let Some(schema) = &config.schema else {
            return Vec::new();
        };
        if !matches!(output, Value::Object(_) | Value::Array(_) | Value::Null) {
            return Vec::new();
        }

        let outcome = self.schema_validator.validate(schema, output);
        if outcome.valid {
            return Vec::new();
        }
        debug!("Schema validation produced {} error(s)", outcome.errors.len());
        outcome
            .errors
            .into_iter()
            .map(|e| Issue::new(IssueKind::Schema, Severity::High, e))
            .collect()
    }

    fn build_report(&self, issues: Vec<Issue>, config: &GuardConfig, input_type: &str) -> GuardReport {
        let score = compute_score(&issues);
        let mut report = GuardReport {
            ok: issues.is_empty(),
            score,
            issues,
            summary: None,
            meta: None,
            config: None,
        };

        if config.verbose {
            report.summary = Some(summarize(&report.issues, score));
            report.meta = Some(ReportMeta {
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                input_type: input_type.to_string(),
                package_version: env!("CARGO_PKG_VERSION").to_string(),
                detectors: self.registry.list_names(),
            });
            report.config = Some(config.clone());
        }
        report
    }
}

impl Default for GuardEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GuardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardEngine")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// One-sentence summary; the penalty is shown unclamped, so it can exceed 100
fn summarize(issues: &[Issue], score: u8) -> String {
    match penalty_total(issues) {
        0 => format!("Detected 0 issue(s). Trust score {}/100.", score),
        penalty => format!(
            "Detected {} issue(s). Trust score {}/100 (-{} penalty points).",
            issues.len(),
            score,
            penalty
        ),
    }
}

/// Runtime type name of an input; `null` reports as `object`
fn input_type(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Object(_) | Value::Array(_) | Value::Null => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::SchemaOutcome;
    use serde_json::json;
    use std::collections::HashMap;

    fn engine() -> GuardEngine {
        GuardEngine::new()
    }

    #[test]
    fn test_clean_text_is_perfect() {
        let report = engine().validate_text("The meeting is at noon.", &GuardConfig::default());
        assert!(report.ok);
        assert_eq!(report.score, 100);
        assert!(report.issues.is_empty());
        assert!(report.summary.is_none());
        assert!(report.meta.is_none());
        assert!(report.config.is_none());
    }

    #[test]
    fn test_string_value_analyzed_as_is() {
        let text = "Revenue grew from 100 to 150. That's a 20% increase.";
        let report = engine()
            .validate(&json!(text), &GuardConfig::default())
            .unwrap();
        assert!(!report.ok);
        assert!(report
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::Numeric && i.severity == Severity::Medium));
        assert_eq!(report.score, compute_score(&report.issues));
    }

    #[test]
    fn test_ok_iff_no_issues() {
        let report = engine().validate_text("It certainly helps.", &GuardConfig::default());
        assert_eq!(report.ok, report.issues.is_empty());
        assert!(!report.ok);
    }

    #[test]
    fn test_schema_issues_come_first() {
        let config = GuardConfig::default().with_schema(json!({
            "type": "object",
            "required": ["answer"]
        }));
        let report = engine()
            .validate(&json!({"reply": "Studies show it works."}), &config)
            .unwrap();
        assert_eq!(report.issues[0].kind, IssueKind::Schema);
        assert_eq!(report.issues[0].severity, Severity::High);
        assert!(report.issues[0].message.contains("answer"));
        assert!(report.issues[1..].iter().all(|i| i.kind != IssueKind::Schema));
    }

    #[test]
    fn test_schema_skipped_for_strings() {
        let config = GuardConfig::default().with_schema(json!({"type": "object"}));
        let report = engine().validate(&json!("plain words"), &config).unwrap();
        assert!(report.issues.iter().all(|i| i.kind != IssueKind::Schema));
    }

    #[test]
    fn test_schema_valid_object() {
        let config = GuardConfig::default().with_schema(json!({
            "type": "object",
            "properties": { "answer": { "type": "string" } },
            "required": ["answer"]
        }));
        let report = engine()
            .validate(&json!({"answer": "yes"}), &config)
            .unwrap();
        assert!(report.ok);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn test_custom_schema_validator() {
        struct RejectAll;
        impl SchemaValidator for RejectAll {
            fn validate(&self, _schema: &Value, _instance: &Value) -> SchemaOutcome {
                SchemaOutcome::invalid(vec!["a".into(), "b".into()])
            }
        }
        let engine = GuardEngine::with_registry(Registry::new()).with_schema_validator(RejectAll);
        let config = GuardConfig::default().with_schema(json!({}));
        let report = engine.validate(&json!({}), &config).unwrap();
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.score, 70);
    }

    #[test]
    fn test_verbose_report() {
        let config = GuardConfig::default().verbose();
        let report = engine()
            .validate(&json!({"answer": "fine"}), &config)
            .unwrap();
        assert_eq!(
            report.summary.as_deref(),
            Some("Detected 0 issue(s). Trust score 100/100.")
        );
        let meta = report.meta.as_ref().unwrap();
        assert_eq!(meta.input_type, "object");
        assert_eq!(meta.package_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(meta.detectors.len(), 7);
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.timestamp).is_ok());
        assert_eq!(report.config.as_ref(), Some(&config));
    }

    #[test]
    fn test_verbose_summary_shows_penalty() {
        let report = engine().validate_text("Studies show it.", &GuardConfig::default().verbose());
        assert_eq!(
            report.summary.as_deref(),
            Some("Detected 1 issue(s). Trust score 92/100 (-8 penalty points).")
        );

        let issues = vec![Issue::new(IssueKind::Bias, Severity::High, "x"); 8];
        assert_eq!(
            summarize(&issues, compute_score(&issues)),
            "Detected 8 issue(s). Trust score 0/100 (-120 penalty points)."
        );
    }

    #[test]
    fn test_input_types() {
        let config = GuardConfig::default().verbose();
        let cases = [
            (json!("text"), "string"),
            (json!(42), "number"),
            (json!(true), "boolean"),
            (json!(null), "object"),
            (json!([1, 2]), "object"),
        ];
        for (value, expected) in cases {
            let report = engine().validate(&value, &config).unwrap();
            assert_eq!(report.meta.unwrap().input_type, expected);
        }
    }

    #[test]
    fn test_registered_detector_runs_after_builtins() {
        let mut engine = engine();
        engine
            .register("always", |_: &str, _: &GuardConfig| -> anyhow::Result<Vec<Issue>> {
                Ok(vec![Issue::new(IssueKind::Other("custom".into()), Severity::High, "x")])
            })
            .unwrap();
        let report = engine.validate_text("Nothing to see.", &GuardConfig::default());
        assert_eq!(report.score, 85);
        assert_eq!(engine.registry().list_names().last().map(String::as_str), Some("always"));
        assert!(engine.register("always", |_: &str, _: &GuardConfig| -> anyhow::Result<Vec<Issue>> {
            Ok(Vec::new())
        })
        .is_err());
    }

    #[test]
    fn test_unserializable_output_is_error() {
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let err = engine()
            .validate_serializable(&bad, &GuardConfig::default())
            .unwrap_err();
        assert!(matches!(err, GuardError::Serialize(_)));
    }

    #[test]
    fn test_deterministic() {
        let text = "Studies show costs will reduce. Costs rose 40% according to nobody.";
        let a = engine().validate_text(text, &GuardConfig::default());
        let b = engine().validate_text(text, &GuardConfig::default());
        assert_eq!(a.score, b.score);
        assert_eq!(a.issues, b.issues);
    }
}
