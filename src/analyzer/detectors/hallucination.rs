//! Hallucination markers: appeals to unnamed research, unverifiable
//! citations and named institutions that may not exist.
//!
//! Rules are matched as regexes first. When a rule's regex misses but its
//! first capturing group is a list of literal alternatives (`(a|b|c)`), those
//! alternatives are fuzzy-matched so that paraphrases still trigger the rule.

use super::{first_match, match_location, merged_rules, rule_kind};
use crate::analyzer::patterns::{compile_rules, CompiledRule, RuleBook};
use crate::analyzer::registry::Detector;
use crate::config::{GuardConfig, RuleSpec};
use crate::text::{char_span, fuzzy_contains_any};
use crate::{Issue, IssueKind, Severity};
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_MESSAGE: &str = "Possible hallucinated or unverifiable content.";

fn institution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Z][a-z]+ (?:Institute|University|Center|Lab|Academy))")
            .expect("static institution regex")
    })
}

/// Detector for fabricated sources and unverifiable references
pub struct HallucinationDetector {
    rules: Vec<CompiledRule>,
}

impl HallucinationDetector {
    pub const NAME: &'static str = "hallucination";

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

impl Default for HallucinationDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for HallucinationDetector {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        if config.hallucination_check == Some(false) {
            return Ok(Vec::new());
        }

        let mut issues = Vec::new();
        for rule in merged_rules(&self.rules, config, Self::NAME) {
            let kind = rule_kind(&rule, IssueKind::Hallucination);
            let message = rule.message_or(DEFAULT_MESSAGE);

            if let Some(m) = first_match(&rule, text) {
                issues.push(
                    Issue::new(kind, rule.spec.severity, message)
                        .with_location(match_location(text, &m)),
                );
                continue;
            }

            let alternatives = literal_alternatives(&rule.spec.pattern);
            if !alternatives.is_empty() && !fuzzy_contains_any(text, &alternatives).is_empty() {
                issues.push(Issue::new(kind, rule.spec.severity, message));
            }
        }

        for caps in institution_re().captures_iter(text) {
            if let Some(name) = caps.get(1) {
                issues.push(
                    Issue::new(
                        IssueKind::Hallucination,
                        Severity::Low,
                        format!("Named institution detected: {}", name.as_str()),
                    )
                    .with_location(char_span(text, name.start(), name.end())),
                );
            }
        }

        Ok(issues)
    }
}

/// Literal alternatives of the first capturing group, e.g. `\b(a|b c)\b` -> `["a", "b c"]`.
///
/// Non-capturing and look-around groups are skipped; nested groups yield nothing.
pub fn literal_alternatives(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    let mut start = None;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '(' if chars.get(i + 1) != Some(&'?') => {
                start = Some(i + 1);
                break;
            }
            _ => i += 1,
        }
    }
    let Some(start) = start else {
        return Vec::new();
    };

    let mut inner = String::new();
    let mut i = start;
    loop {
        match chars.get(i) {
            None | Some('(') => return Vec::new(),
            Some(')') => break,
            Some('\\') => {
                inner.push('\\');
                if let Some(&next) = chars.get(i + 1) {
                    inner.push(next);
                }
                i += 2;
            }
            Some(&c) => {
                inner.push(c);
                i += 1;
            }
        }
    }

    inner
        .split('|')
        .map(|part| part.replace("\\b", "").replace('\\', "").trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
