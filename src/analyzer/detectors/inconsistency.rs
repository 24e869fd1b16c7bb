//! Cross-sentence contradictions in quantity direction ("costs will fall" ... "costs rose").

use crate::analyzer::registry::Detector;
use crate::config::GuardConfig;
use crate::{Issue, IssueKind, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// Sentences compared forward from each sentence
const SENTENCE_WINDOW: usize = 5;

/// A sentence must mention one of these to open a comparison
const TRIGGERS: &[&str] = &["cost", "costs", "growth", "reduce"];

/// Words that mark a direction in the opening sentence
const DIRECTION_GATE: &[&str] = &["increase", "decrease", "reduce"];

const INCREASE_MARKERS: &[&str] = &["increase", "rose"];
const DECREASE_MARKERS: &[&str] = &["decrease", "fell", "reduce"];

fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.\n!?]+").expect("static sentence regex"))
}

#[derive(Debug, Default)]
pub struct InconsistencyDetector;

impl InconsistencyDetector {
    pub const NAME: &'static str = "inconsistency";

    pub fn new() -> Self {
        Self
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Trimmed, non-empty sentences
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_split_re()
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl Detector for InconsistencyDetector {
    fn detect(&self, text: &str, _config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        let sentences = split_sentences(text);
        let lowered: Vec<String> = sentences.iter().map(|s| s.to_lowercase()).collect();

        let mut issues = Vec::new();
        for i in 0..sentences.len() {
            let a = &lowered[i];
            if !contains_any(a, TRIGGERS) || !contains_any(a, DIRECTION_GATE) {
                continue;
            }
            let a_up = contains_any(a, INCREASE_MARKERS);
            let a_down = contains_any(a, DECREASE_MARKERS);

            let end = sentences.len().min(i + SENTENCE_WINDOW + 1);
            for j in (i + 1)..end {
                let b = &lowered[j];
                let b_up = contains_any(b, INCREASE_MARKERS);
                let b_down = contains_any(b, DECREASE_MARKERS);
                if (b_up && a_down) || (b_down && a_up) {
                    issues.push(Issue::new(
                        IssueKind::Inconsistency,
                        Severity::High,
                        format!(
                            "Contradicting statements between sentences: \"{}\" vs \"{}\"",
                            sentences[i], sentences[j]
                        ),
                    ));
                }
            }
        }
        Ok(issues)
    }
}
