//! Built-in detectors

pub mod bias;
pub mod claims;
pub mod hallucination;
pub mod inconsistency;
pub mod numeric;
pub mod overconfidence;
pub mod source;

pub use bias::BiasDetector;
pub use claims::ClaimsDetector;
pub use hallucination::HallucinationDetector;
pub use inconsistency::InconsistencyDetector;
pub use numeric::NumericDetector;
pub use overconfidence::OverconfidenceDetector;
pub use source::SourceDetector;

use super::patterns::{compile_custom_rules, CompiledRule};
use crate::config::GuardConfig;
use crate::text::{char_span, has_negation_before};
use crate::IssueKind;
use regex::Match;

/// Built-in rules followed by the caller's custom rules for `detector`
fn merged_rules<'a>(
    builtin: &'a [CompiledRule],
    config: &GuardConfig,
    detector: &str,
) -> Vec<std::borrow::Cow<'a, CompiledRule>> {
    let custom = compile_custom_rules(config.custom_rules_for(detector));
    builtin
        .iter()
        .map(std::borrow::Cow::Borrowed)
        .chain(custom.into_iter().map(std::borrow::Cow::Owned))
        .collect()
}

/// First match of the rule, ignoring negated matches when the rule asks for it
fn first_match<'t>(rule: &CompiledRule, text: &'t str) -> Option<Match<'t>> {
    rule.regex
        .find_iter(text)
        .find(|m| !(rule.spec.skip_negated && has_negation_before(text, m.start())))
}

/// Issue type declared by the rule, or the detector's default
fn rule_kind(rule: &CompiledRule, default: IssueKind) -> IssueKind {
    rule.spec
        .kind
        .as_deref()
        .map(IssueKind::from)
        .unwrap_or(default)
}

fn match_location(text: &str, m: &Match<'_>) -> String {
    char_span(text, m.start(), m.end())
}
