//! JSON reporter for machine-readable output

use crate::batch::BatchSummary;
use crate::GuardReport;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Report a single validation result as JSON
    pub fn report(&self, report: &GuardReport) -> String {
        self.to_json(report, "{}")
    }

    /// Report a batch summary as JSON
    pub fn report_batch(&self, summary: &BatchSummary) -> String {
        self.to_json(summary, "{}")
    }

    fn to_json<T: serde::Serialize>(&self, value: &T, fallback: &str) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|_| fallback.to_string())
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}
