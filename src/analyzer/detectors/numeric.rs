//! Numeric consistency heuristics.
//!
//! Two independent checks, both tuned to miss rather than over-report:
//! - a `from A to B` range compared against the nearest percent literal
//! - a `total: N` claim compared against the numbers listed before it

use crate::analyzer::registry::Detector;
use crate::config::GuardConfig;
use crate::text::{char_span, char_window};
use crate::{Issue, IssueKind, Severity};
use regex::Regex;
use std::sync::OnceLock;

/// Characters searched before / after the start of a range for a percent literal
const PERCENT_WINDOW_BEFORE: usize = 100;
const PERCENT_WINDOW_AFTER: usize = 200;

/// Allowed gap, in percentage points, between stated and implied change
const PERCENT_TOLERANCE: f64 = 5.0;

/// Allowed relative error between the listed components and a total
const TOTAL_TOLERANCE: f64 = 0.05;

/// Components considered before a total
const MAX_COMPONENTS: usize = 5;

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)from\s+(\d+(?:\.\d+)?)\s*(million|billion|k|m)?\s*to\s+(\d+(?:\.\d+)?)\s*(million|billion|k|m)?",
        )
        .expect("static range regex")
    })
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)%").expect("static percent regex"))
}

fn total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)total(?:ed|s|:)\s*(\$?\d[\d,.kmb]*)").expect("static total regex")
    })
}

fn component_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\$?\d[\d,.kmb]*").expect("static component regex"))
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:\.\d+)?").expect("static number regex"))
}

#[derive(Debug, Default)]
pub struct NumericDetector;

impl NumericDetector {
    pub const NAME: &'static str = "numeric";

    pub fn new() -> Self {
        Self
    }
}

impl Detector for NumericDetector {
    fn detect(&self, text: &str, config: &GuardConfig) -> anyhow::Result<Vec<Issue>> {
        if config.numeric_consistency == Some(false) {
            return Ok(Vec::new());
        }
        let mut issues = check_ranges(text);
        issues.extend(check_total(text));
        Ok(issues)
    }
}

fn unit_multiplier(unit: Option<&str>) -> f64 {
    match unit.map(str::to_ascii_lowercase).as_deref() {
        Some("k") => 1e3,
        Some("m") | Some("million") => 1e6,
        Some("billion") => 1e9,
        _ => 1.0,
    }
}

/// Leading decimal prefix of a cleaned literal: `"1.5k"` -> 1.5, `"1.2.3"` -> 1.2
fn parse_leading(literal: &str) -> Option<f64> {
    let cleaned: String = literal.chars().filter(|c| *c != '$' && *c != ',').collect();
    leading_number_re()
        .find(&cleaned)
        .and_then(|m| m.as_str().parse().ok())
}

fn check_ranges(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    for caps in range_re().captures_iter(text) {
        let (Some(whole), Some(from), Some(to)) = (caps.get(0), caps.get(1), caps.get(3)) else {
            continue;
        };

        // A unit on one side only ("from 2 to 3 million") applies to both
        let (from_unit, to_unit) = match (caps.get(2), caps.get(4)) {
            (Some(u), None) | (None, Some(u)) => (Some(u.as_str()), Some(u.as_str())),
            (a, b) => (a.map(|m| m.as_str()), b.map(|m| m.as_str())),
        };
        let (Ok(a), Ok(b)) = (from.as_str().parse::<f64>(), to.as_str().parse::<f64>()) else {
            continue;
        };
        let a = a * unit_multiplier(from_unit);
        let b = b * unit_multiplier(to_unit);
        if a <= 0.0 {
            continue;
        }

        let implied = (b - a) / a * 100.0;
        let Some(stated) = nearest_percent(text, whole.start(), whole.end()) else {
            continue;
        };
        // Stated percentages are unsigned ("a 25% drop"), so compare magnitudes
        if (stated - implied.abs()).abs() > PERCENT_TOLERANCE {
            issues.push(
                Issue::new(
                    IssueKind::Numeric,
                    Severity::Medium,
                    format!(
                        "Percentage {}% inconsistent with change from {} to {} (~{:.1}%).",
                        stated,
                        from.as_str(),
                        to.as_str(),
                        implied
                    ),
                )
                .with_location(char_span(text, whole.start(), whole.end())),
            );
        }
    }
    issues
}

/// Percent literal closest to the byte span `start..end`, searched from 100
/// characters before `start` to 200 characters after it.
fn nearest_percent(text: &str, start: usize, end: usize) -> Option<f64> {
    let (lo, hi) = char_window(text, start, PERCENT_WINDOW_BEFORE, PERCENT_WINDOW_AFTER);
    let window = &text[lo..hi];

    percent_re()
        .captures_iter(window)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            let (m_start, m_end) = (lo + m.start(), lo + m.end());
            let distance = if m_end <= start {
                text[m_end..start].chars().count()
            } else if m_start >= end {
                text[end..m_start].chars().count()
            } else {
                0
            };
            Some((distance, value))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, value)| value)
}

fn check_total(text: &str) -> Option<Issue> {
    let caps = total_re().captures(text)?;
    let whole = caps.get(0)?;
    let total = parse_leading(caps.get(1)?.as_str())?;

    let components: Vec<f64> = component_re()
        .find_iter(&text[..whole.start()])
        .filter_map(|m| parse_leading(m.as_str()))
        .take(MAX_COMPONENTS)
        .collect();
    if components.len() < 2 {
        return None;
    }

    let sum: f64 = components.iter().sum();
    if (sum - total).abs() / total.max(1.0) <= TOTAL_TOLERANCE {
        return None;
    }
    Some(
        Issue::new(
            IssueKind::Numeric,
            Severity::Medium,
            format!(
                "Listed components sum ({}) differs from claimed total ({}).",
                sum, total
            ),
        )
        .with_location(char_span(text, whole.start(), whole.end())),
    )
}
