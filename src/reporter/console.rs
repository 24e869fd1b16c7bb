//! Console reporter with colored output

use crate::analyzer::scoring::score_description;
use crate::batch::BatchSummary;
use crate::{GuardReport, Issue, Severity};
use colored::{ColoredString, Colorize};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print a single report
    pub fn report(&self, report: &GuardReport) {
        print!("{}", self.render(report));
    }

    /// Print a batch summary
    pub fn report_batch(&self, summary: &BatchSummary) {
        print!("{}", self.render_batch(summary));
    }

    pub fn render(&self, report: &GuardReport) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {}",
            self.paint(&format!("Trust score: {}/100", report.score), |s| s.bold()),
            self.create_score_bar(report.score)
        );
        let _ = writeln!(
            out,
            "   {}",
            self.paint(score_description(report.score), |s| s.dimmed())
        );
        if let Some(summary) = &report.summary {
            let _ = writeln!(out, "   {}", self.paint(summary, |s| s.dimmed()));
        }
        out.push('\n');

        if report.issues.is_empty() {
            let _ = writeln!(out, "   {}", self.paint("No issues detected.", |s| s.green()));
            return out;
        }

        out.push_str(&self.render_issue_table(&report.issues));

        if self.verbose {
            if let Some(meta) = &report.meta {
                out.push('\n');
                let _ = writeln!(
                    out,
                    "   {}",
                    self.paint(
                        &format!(
                            "trustscore {} | input: {} | detectors: {} | {}",
                            meta.package_version,
                            meta.input_type,
                            meta.detectors.join(", "),
                            meta.timestamp
                        ),
                        |s| s.dimmed()
                    )
                );
            }
        }
        out
    }

    fn render_issue_table(&self, issues: &[Issue]) -> String {
        let type_width = issues
            .iter()
            .map(|i| i.kind.as_str().len())
            .max()
            .unwrap_or(0)
            .max("Type".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "   {}",
            self.paint(
                &format!("{:<type_width$}  {:<8}  {}", "Type", "Severity", "Message"),
                |s| s.bold()
            )
        );
        for issue in issues {
            // Pad before coloring so escape codes don't break alignment
            let severity = format!("{:<8}", issue.severity.to_string());
            let mut line = format!(
                "   {:<type_width$}  {}  {}",
                issue.kind.as_str(),
                self.colorize_severity(issue.severity, &severity),
                issue.message
            );
            if self.verbose {
                if let Some(location) = &issue.location {
                    let _ = write!(line, " {}", self.paint(&format!("[{}]", location), |s| s.dimmed()));
                }
            }
            let _ = writeln!(out, "{}", line);
        }
        out
    }

    pub fn render_batch(&self, summary: &BatchSummary) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.paint("Batch run summary:", |s| s.bold()));
        let _ = writeln!(out, "   Total items:   {}", summary.total);
        let _ = writeln!(out, "   Average score: {:.2}", summary.average_score);

        let _ = writeln!(out, "   Issue types:");
        if summary.type_counts.is_empty() {
            let _ = writeln!(out, "      (none)");
        }
        for (kind, count) in &summary.type_counts {
            let _ = writeln!(out, "      {:<16} {}", kind, count);
        }

        let _ = writeln!(out, "   Severity counts:");
        if summary.severity_counts.is_empty() {
            let _ = writeln!(out, "      (none)");
        }
        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            if let Some(count) = summary.severity_counts.get(&severity.to_string()) {
                let label = format!("{:<16}", severity.to_string());
                let _ = writeln!(
                    out,
                    "      {} {}",
                    self.colorize_severity(severity, &label),
                    count
                );
            }
        }
        out
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.use_colors {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn colorize_severity(&self, severity: Severity, text: &str) -> String {
        self.paint(text, |s| match severity {
            Severity::High => s.red().bold(),
            Severity::Medium => s.yellow(),
            Severity::Low => s.dimmed(),
        })
    }

    fn create_score_bar(&self, score: u8) -> String {
        let filled = (usize::from(score) * BAR_WIDTH) / 100;
        let bar = format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));

        self.paint(&bar, |s| {
            if score >= 80 {
                s.green()
            } else if score >= 60 {
                s.yellow()
            } else {
                s.red()
            }
        })
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}
