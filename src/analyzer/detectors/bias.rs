//! Loaded or emotionally charged language, matched fuzzily so inflections and
//! typos of a charged word still register.

use crate::analyzer::patterns::RuleBook;
use crate::analyzer::registry::Detector;
use crate::config::{GuardConfig, RuleSpec};
use crate::text::fuzzy_contains_any;
use crate::{Issue, IssueKind, Severity};

/// Used when neither the rule book nor the config supplies any bias phrases
const FALLBACK_PHRASES: &[&str] = &["obviously", "no doubt", "they are criminals", "they are terrorists"];

pub struct BiasDetector {
    rules: Vec<RuleSpec>,
}

impl BiasDetector {
    pub const NAME: &'static str = "bias";

    pub fn new() -> Self {
        Self::from_book(RuleBook::bundled())
    }

    pub fn from_book(book: &RuleBook) -> Self {
        Self::with_rules(book.rules_for(Self::NAME).to_vec())
    }

    pub fn with_rules(rules: Vec<RuleSpec>) -> Self {
        Self { rules }
    }
}

impl Default for BiasDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Phrase form of a rule pattern: word-boundary anchors removed
fn rule_phrase(pattern: &str) -> String {
    pattern.replace("\\b", "").trim().to_string()
}

fn generic_issue(phrase: &str) -> Issue {
    Issue::new(
        IssueKind::Bias,
        Severity::Low,
        format!("Loaded or emotionally charged phrase detected: \"{}\"", phrase),
    )
}

impl Detector for BiasDetector {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        let rules: Vec<&RuleSpec> = self
            .rules
            .iter()
            .chain(config.custom_rules_for(Self::NAME))
            .collect();

        let mut phrases: Vec<String> = Vec::new();
        for rule in &rules {
            let phrase = rule_phrase(&rule.pattern);
            if !phrase.is_empty() && !phrases.contains(&phrase) {
                phrases.push(phrase);
            }
        }
        if phrases.is_empty() {
            phrases = FALLBACK_PHRASES.iter().map(|p| p.to_string()).collect();
        }

        let issues = fuzzy_contains_any(text, &phrases)
            .into_iter()
            .map(|matched| {
                let mut issue = generic_issue(matched);
                if let Some(rule) = rules.iter().find(|r| rule_phrase(&r.pattern) == matched) {
                    issue.severity = rule.severity;
                    if let Some(kind) = rule.kind.as_deref() {
                        issue.kind = IssueKind::from(kind);
                    }
                    if let Some(message) = &rule.message {
                        issue.message = message.clone();
                    }
                }
                issue
            })
            .collect();
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Vec<Issue> {
        BiasDetector::new()
            .detect(text, &GuardConfig::default())
            .unwrap()
    }

    #[test]
    fn test_charged_words_flagged_with_rule_metadata() {
        let issues = detect("Obviously, those lunatics are wrong.");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, IssueKind::Bias);
        assert_eq!(issues[0].severity, Severity::Low);
        assert_eq!(issues[1].severity, Severity::Medium);
        assert!(issues[1].message.contains("lunatics"));
    }

    #[test]
    fn test_misspelling_still_matches() {
        let issues = detect("They called the protesters terorists.");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn test_neutral_text_clean() {
        assert!(detect("The committee reviewed the proposal on Tuesday.").is_empty());
    }

    #[test]
    fn test_fallback_phrases_when_no_rules() {
        let detector = BiasDetector::with_rules(Vec::new());
        let issues = detector
            .detect("There is no doubt about it.", &GuardConfig::default())
            .unwrap();
        assert!(!issues.is_empty());
        assert_eq!(
            issues[0].message,
            "Loaded or emotionally charged phrase detected: \"no doubt\""
        );
        assert_eq!(issues[0].severity, Severity::Low);
    }

    #[test]
    fn test_custom_rule_without_message_uses_generic() {
        let mut rule = RuleSpec::new(r"\bsnowflakes\b", Severity::Medium, "");
        rule.message = None;
        let config = GuardConfig::default().with_custom_rule("bias", rule);
        let issues = BiasDetector::with_rules(Vec::new())
            .detect("Only snowflakes complain.", &config)
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(
            issues[0].message,
            "Loaded or emotionally charged phrase detected: \"snowflakes\""
        );
    }
}
