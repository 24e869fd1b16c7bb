//! Vague sourcing ("sources say", "experts believe")

use super::{first_match, match_location, merged_rules, rule_kind};
use crate::analyzer::patterns::{compile_rules, CompiledRule, RuleBook};
use crate::analyzer::registry::Detector;
use crate::config::{GuardConfig, RuleSpec};
use crate::{Issue, IssueKind};

const DEFAULT_MESSAGE: &str = "Vague source citation detected.";

pub struct SourceDetector {
    rules: Vec<CompiledRule>,
}

impl SourceDetector {
    pub const NAME: &'static str = "source";

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

impl Default for SourceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SourceDetector {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        let issues = merged_rules(&self.rules, config, Self::NAME)
            .iter()
            .filter_map(|rule| {
                let m = first_match(rule, text)?;
                Some(
                    Issue::new(
                        rule_kind(rule, IssueKind::Source),
                        rule.spec.severity,
                        rule.message_or(DEFAULT_MESSAGE),
                    )
                    .with_location(match_location(text, &m)),
                )
            })
            .collect();
        Ok(issues)
    }
}
