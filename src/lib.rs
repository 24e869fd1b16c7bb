//! Trustscore: heuristic trust scoring for LLM outputs
//!
//! This library runs a set of independent lexical detectors (hallucination
//! markers, overconfidence, numeric consistency, contradictions, unsourced
//! claims, biased language, vague sourcing) over a model output and reduces
//! their findings to a 0-100 trust score plus a structured issue list.

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod guard;
pub mod reporter;
pub mod text;
pub mod validator;

pub use analyzer::engine::{GuardEngine, GuardError};
pub use analyzer::registry::{default_registry, Detector, Registry, RegistryError};
pub use analyzer::scoring::compute_score;
pub use config::{GuardConfig, RuleSpec};
pub use guard::{validate_and_decide, Decision, GuardHandler, GuardOptions, GuardResponse};

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Severity of an issue. The lowercase names are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Points subtracted from the trust score for one issue of this severity
    pub fn penalty(self) -> i32 {
        match self {
            Severity::High => analyzer::scoring::PENALTY_HIGH,
            Severity::Medium => analyzer::scoring::PENALTY_MEDIUM,
            Severity::Low => analyzer::scoring::PENALTY_LOW,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Category of an issue.
///
/// Open-ended: rules and custom detectors may introduce their own types, which
/// round-trip through [`IssueKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueKind {
    Hallucination,
    Schema,
    Numeric,
    Confidence,
    Inconsistency,
    Bias,
    Claim,
    Source,
    Other(String),
}

impl IssueKind {
    pub fn as_str(&self) -> &str {
        match self {
            IssueKind::Hallucination => "hallucination",
            IssueKind::Schema => "schema",
            IssueKind::Numeric => "numeric",
            IssueKind::Confidence => "confidence",
            IssueKind::Inconsistency => "inconsistency",
            IssueKind::Bias => "bias",
            IssueKind::Claim => "claim",
            IssueKind::Source => "source",
            IssueKind::Other(name) => name,
        }
    }
}

impl From<String> for IssueKind {
    fn from(value: String) -> Self {
        IssueKind::from(value.as_str())
    }
}

impl From<&str> for IssueKind {
    fn from(value: &str) -> Self {
        match value {
            "hallucination" => IssueKind::Hallucination,
            "schema" => IssueKind::Schema,
            "numeric" => IssueKind::Numeric,
            "confidence" => IssueKind::Confidence,
            "inconsistency" => IssueKind::Inconsistency,
            "bias" => IssueKind::Bias,
            "claim" => IssueKind::Claim,
            "source" => IssueKind::Source,
            other => IssueKind::Other(other.to_string()),
        }
    }
}

impl From<IssueKind> for String {
    fn from(value: IssueKind) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flagged problem in an output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue category (`type` on the wire)
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Severity, determines the score penalty
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Character span in the analyzed text, e.g. `"12..18"` (when known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Issue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Result of validating one output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardReport {
    /// True when no issues were found
    pub ok: bool,
    /// Trust score (0-100)
    pub score: u8,
    /// Issues in detection order (schema issues first)
    pub issues: Vec<Issue>,
    /// One-sentence summary (verbose only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Run metadata (verbose only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ReportMeta>,
    /// Echo of the configuration used (verbose only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GuardConfig>,
}

/// Metadata attached to verbose reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    /// RFC 3339 timestamp of the run
    pub timestamp: String,
    /// Runtime type name of the input (`string`, `object`, `number`, `boolean`)
    pub input_type: String,
    /// Version of this crate
    pub package_version: String,
    /// Registered detector names in execution order
    pub detectors: Vec<String>,
}

/// Process-wide engine with the default detector set.
pub fn global_engine() -> &'static GuardEngine {
    static ENGINE: OnceLock<GuardEngine> = OnceLock::new();
    ENGINE.get_or_init(GuardEngine::new)
}

/// Public API: validate one output (string or JSON value) with the default engine.
pub fn validate(
    output: &serde_json::Value,
    config: &GuardConfig,
) -> Result<GuardReport, GuardError> {
    global_engine().validate(output, config)
}

/// Validate plain text with the default engine. Never fails.
pub fn validate_text(text: &str, config: &GuardConfig) -> GuardReport {
    global_engine().validate_text(text, config)
}
