//! Overconfident language: certainty markers and absolute guarantees.

use super::{first_match, match_location, merged_rules, rule_kind};
use crate::analyzer::patterns::{compile_rules, CompiledRule, RuleBook};
use crate::analyzer::registry::Detector;
use crate::config::{GuardConfig, RuleSpec};
use crate::{Issue, IssueKind, Severity};

const DEFAULT_MESSAGE: &str = "Overconfident language:";

pub struct OverconfidenceDetector {
    rules: Vec<CompiledRule>,
}

impl OverconfidenceDetector {
    pub const NAME: &'static str = "overconfidence";

    pub fn new() -> Self {
        Self::from_book(RuleBook::bundled())
    }

    pub fn from_book(book: &RuleBook) -> Self {
        Self::with_rules(book.rules_for(Self::NAME))
    }

    pub fn with_rules(specs: &[RuleSpec]) -> Self {
        Self {
            rules: compile_rules(specs),
        }
    }
}

impl Default for OverconfidenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for OverconfidenceDetector {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        if config.overconfidence_check == Some(false) {
            return Ok(Vec::new());
        }

        let mut issues = Vec::new();
        let mut matched_rules = 0usize;
        for rule in merged_rules(&self.rules, config, Self::NAME) {
            let Some(m) = first_match(&rule, text) else {
                continue;
            };
            matched_rules += 1;
            issues.push(
                Issue::new(
                    rule_kind(&rule, IssueKind::Confidence),
                    rule.spec.severity,
                    format!("{} \"{}\"", rule.message_or(DEFAULT_MESSAGE), m.as_str()),
                )
                .with_location(match_location(text, &m)),
            );
        }

        // One extra issue when several distinct rules fire
        if matched_rules > 1 {
            issues.push(Issue::new(
                IssueKind::Confidence,
                Severity::Medium,
                format!("{} strong certainty markers found.", matched_rules),
            ));
        }

        Ok(issues)
    }
}
