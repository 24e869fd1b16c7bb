//! Score calculation: 100 minus severity-weighted penalties, floored at 0

use crate::Issue;

/// Penalty points per issue by severity
pub const PENALTY_HIGH: i32 = 15;
pub const PENALTY_MEDIUM: i32 = 8;
pub const PENALTY_LOW: i32 = 3;

/// Score of an output with no issues
pub const MAX_SCORE: u8 = 100;

/// Sum of penalties for all issues (order-independent)
pub fn penalty_total(issues: &[Issue]) -> i32 {
    issues.iter().map(|i| i.severity.penalty()).sum()
}

/// Trust score for a list of issues, in `0..=100`
pub fn compute_score(issues: &[Issue]) -> u8 {
    (i32::from(MAX_SCORE) - penalty_total(issues)).clamp(0, i32::from(MAX_SCORE)) as u8
}

/// Short human description of a score band
pub fn score_description(score: u8) -> &'static str {
    match score {
        90..=100 => "Trustworthy - few or no warning signs",
        70..=89 => "Mostly trustworthy - review the flagged passages",
        40..=69 => "Questionable - several unsupported or risky statements",
        _ => "Untrustworthy - verify before use",
    }
}
