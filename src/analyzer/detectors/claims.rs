//! Unsupported numeric claims: numbers and percentages with no source marker nearby.

use crate::analyzer::patterns::{
    compile_custom_rules, compile_rules, CompiledRule, RuleBook,
};
use crate::analyzer::registry::Detector;
use crate::config::GuardConfig;
use crate::text::{char_span, window_around};
use crate::{Issue, IssueKind, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// Characters searched on each side of a number for a source marker
const SOURCE_WINDOW: usize = 80;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b\d{1,3}(?:[\d,]*\d)?(?:\.\d+)?(?:%| percent)?\b").expect("static number regex")
    })
}

fn default_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:according to|reported by|per the report|as reported|source is)\b|\bsources?:")
            .expect("static source marker regex")
    })
}

pub struct ClaimsDetector {
    markers: Vec<CompiledRule>,
}

impl ClaimsDetector {
    pub const NAME: &'static str = "claims";

    pub fn new() -> Self {
        Self::from_book(RuleBook::bundled())
    }

    /// Source markers come from both the `claims` and `source` rule lists.
    pub fn from_book(book: &RuleBook) -> Self {
        Self {
            markers: compile_rules(
                book.rules_for(Self::NAME)
                    .iter()
                    .chain(book.rules_for(super::SourceDetector::NAME)),
            ),
        }
    }
}

impl Default for ClaimsDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for ClaimsDetector {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        let custom = compile_custom_rules(config.custom_rules_for(Self::NAME));
        let has_marker = |window: &str| {
            default_marker_re().is_match(window)
                || self
                    .markers
                    .iter()
                    .chain(custom.iter())
                    .any(|rule| rule.regex.is_match(window))
        };

        let issues = number_re()
            .find_iter(text)
            .filter(|m| !has_marker(window_around(text, m.start(), SOURCE_WINDOW, SOURCE_WINDOW)))
            .map(|m| {
                Issue::new(
                    IssueKind::Claim,
                    Severity::Low,
                    format!(
                        "Numeric/factual claim without explicit source near: \"{}\"",
                        m.as_str()
                    ),
                )
                .with_location(char_span(text, m.start(), m.end()))
            })
            .collect();
        Ok(issues)
    }
}
