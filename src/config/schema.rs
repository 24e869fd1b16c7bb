//! Config schema and deserialization

use crate::Severity;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A data-driven detection rule, as found in the bundled rule file or in
/// `customRules`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSpec {
    /// Regex source (or a plain phrase for phrase-matching detectors)
    pub pattern: String,
    /// Regex flags; `i` is assumed when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    /// Issue type to emit instead of the detector's default
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Severity of the emitted issue (default: low)
    #[serde(default)]
    pub severity: Severity,
    /// Issue message; detectors supply a default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Ignore matches preceded by a negation ("not guaranteed")
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_negated: bool,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: None,
            kind: None,
            severity,
            message: Some(message.into()),
            skip_negated: false,
        }
    }

    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags = Some(flags.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Options for one validation call.
///
/// Loaded from `.trustscorerc.json` or built in code. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    /// Extend another config file (path relative to this config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// JSON Schema applied to object outputs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    /// Run the numeric consistency detector (default: on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_consistency: Option<bool>,

    /// Run the hallucination detector (default: on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hallucination_check: Option<bool>,

    /// Run the overconfidence detector (default: on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overconfidence_check: Option<bool>,

    /// Extra rules per detector name, appended to the bundled rules
    #[serde(
        default,
        deserialize_with = "deserialize_custom_rules",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub custom_rules: BTreeMap<String, Vec<RuleSpec>>,

    /// Attach summary, metadata and the config echo to reports
    #[serde(default)]
    pub verbose: bool,

    /// Minimum acceptable score for the CLI (exit 3 if below)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u8>,
}

impl GuardConfig {
    /// Custom rules registered for a detector (empty when none)
    pub fn custom_rules_for(&self, detector: &str) -> &[RuleSpec] {
        self.custom_rules
            .get(detector)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn with_custom_rule(mut self, detector: impl Into<String>, rule: RuleSpec) -> Self {
        self.custom_rules.entry(detector.into()).or_default().push(rule);
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, cli_threshold: Option<u8>, cli_verbose: bool) -> Self {
        if cli_threshold.is_some() {
            self.threshold = cli_threshold;
        }
        if cli_verbose {
            self.verbose = true;
        }
        self
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: GuardConfig) {
        // Base values are overridden by this config's values
        if self.extends.is_none() {
            self.extends = base.extends;
        }
        if self.schema.is_none() {
            self.schema = base.schema;
        }
        if self.numeric_consistency.is_none() {
            self.numeric_consistency = base.numeric_consistency;
        }
        if self.hallucination_check.is_none() {
            self.hallucination_check = base.hallucination_check;
        }
        if self.overconfidence_check.is_none() {
            self.overconfidence_check = base.overconfidence_check;
        }
        if self.threshold.is_none() {
            self.threshold = base.threshold;
        }
        self.verbose = self.verbose || base.verbose;

        // Base rules run first, then this config's additions
        for (detector, mut base_rules) in base.custom_rules {
            let own = self.custom_rules.entry(detector).or_default();
            base_rules.append(own);
            *own = base_rules;
        }
    }
}

/// Parse `customRules` entry by entry; records that are not valid rules are
/// dropped so that one bad entry cannot reject the whole config.
fn deserialize_custom_rules<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<RuleSpec>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (detector, entries) in raw.unwrap_or_default() {
        let Value::Array(entries) = entries else {
            tracing::warn!("customRules.{} is not a list; ignoring", detector);
            continue;
        };
        let rules: Vec<RuleSpec> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RuleSpec>(entry) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!("Skipping invalid rule in customRules.{}: {}", detector, e);
                    None
                }
            })
            .collect();
        out.insert(detector, rules);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_ignored() {
        let config: GuardConfig =
            serde_json::from_str(r#"{ "verbose": true, "requiredSections": ["a"] }"#).unwrap();
        assert!(config.verbose);
    }

    #[test]
    fn test_custom_rules_skip_invalid_entries() {
        let config: GuardConfig = serde_json::from_str(
            r#"{
                "customRules": {
                    "source": [
                        { "pattern": "insiders claim", "severity": "medium" },
                        { "severity": "high" },
                        { "pattern": "x", "severity": "critical" },
                        { "pattern": "rumor has it" }
                    ],
                    "bias": "not-a-list"
                }
            }"#,
        )
        .unwrap();

        let source = config.custom_rules_for("source");
        assert_eq!(source.len(), 2);
        assert_eq!(source[0].severity, Severity::Medium);
        assert_eq!(source[1].severity, Severity::Low);
        assert!(config.custom_rules_for("bias").is_empty());
        assert!(config.custom_rules_for("hallucination").is_empty());
    }

    #[test]
    fn test_rule_spec_type_field() {
        let rule: RuleSpec = serde_json::from_str(
            r#"{ "pattern": "foo", "type": "custom", "flags": "im", "skipNegated": true }"#,
        )
        .unwrap();
        assert_eq!(rule.kind.as_deref(), Some("custom"));
        assert_eq!(rule.flags.as_deref(), Some("im"));
        assert!(rule.skip_negated);
    }

    #[test]
    fn test_config_round_trips_camel_case() {
        let config = GuardConfig {
            hallucination_check: Some(false),
            ..GuardConfig::default()
        }
        .with_custom_rule("claims", RuleSpec::new("per the filing", Severity::Low, "m"));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["hallucinationCheck"], serde_json::json!(false));
        assert!(json["customRules"]["claims"].is_array());
        assert!(json.get("schema").is_none());
    }

    #[test]
    fn test_merge_from_base_rules_first() {
        let mut child = GuardConfig {
            threshold: Some(80),
            ..GuardConfig::default()
        }
        .with_custom_rule("source", RuleSpec::new("child", Severity::Low, "c"));
        let base = GuardConfig {
            threshold: Some(60),
            numeric_consistency: Some(false),
            ..GuardConfig::default()
        }
        .with_custom_rule("source", RuleSpec::new("base", Severity::Low, "b"));

        child.merge_from(base);

        assert_eq!(child.threshold, Some(80));
        assert_eq!(child.numeric_consistency, Some(false));
        let patterns: Vec<_> = child
            .custom_rules_for("source")
            .iter()
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["base", "child"]);
    }

    #[test]
    fn test_merge_with_cli() {
        let config = GuardConfig::default().merge_with_cli(Some(90), true);
        assert_eq!(config.threshold, Some(90));
        assert!(config.verbose);
    }
}
