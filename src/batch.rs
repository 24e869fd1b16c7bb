//! Batch validation of JSON Lines files.
//!
//! Each non-empty line is a JSON value. The analyzed output is the item's
//! `text` field when present, otherwise the whole item. Items are validated on
//! a bounded rayon pool and results keep input order.

use crate::analyzer::engine::GuardEngine;
use crate::config::GuardConfig;
use crate::GuardReport;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Worker threads used when the caller does not choose
pub const DEFAULT_PARALLELISM: usize = 4;

/// One parsed input line
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// 1-based line number in the input file
    pub line: usize,
    pub id: Option<Value>,
    pub output: Value,
}

impl BatchItem {
    pub fn from_value(line: usize, item: Value) -> Self {
        let id = item.get("id").cloned();
        let output = match item.get("text") {
            Some(text) if !text.is_null() => text.clone(),
            _ => item,
        };
        Self { line, id, output }
    }
}

/// One output line: the item's id and its report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub report: GuardReport,
}

/// Aggregate figures over a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub average_score: f64,
    pub type_counts: BTreeMap<String, usize>,
    pub severity_counts: BTreeMap<String, usize>,
}

/// Parse JSON Lines content. Blank lines are skipped; malformed lines are
/// logged and skipped.
pub fn parse_items(content: &str) -> Vec<BatchItem> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(BatchItem::from_value(idx + 1, value)),
            Err(e) => {
                warn!("Skipping malformed line {}: {}", idx + 1, e);
                None
            }
        })
        .collect()
}

/// Validate every item on a pool of `parallel` threads, preserving input order.
pub fn run_batch(
    engine: &GuardEngine,
    items: &[BatchItem],
    config: &GuardConfig,
    parallel: usize,
) -> Result<Vec<BatchRecord>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(parallel.max(1))
        .build()
        .context("Failed to build batch thread pool")?;

    let records: Vec<BatchRecord> = pool.install(|| {
        items
            .par_iter()
            .filter_map(|item| match engine.validate(&item.output, config) {
                Ok(report) => Some(BatchRecord {
                    id: item.id.clone(),
                    report,
                }),
                Err(e) => {
                    warn!("Item on line {} failed: {}", item.line, e);
                    None
                }
            })
            .collect()
    });
    Ok(records)
}

/// Count, average score and issue counts by type and severity
pub fn summarize(records: &[BatchRecord]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: records.len(),
        ..BatchSummary::default()
    };
    if records.is_empty() {
        return summary;
    }

    let score_sum: u64 = records.iter().map(|r| u64::from(r.report.score)).sum();
    summary.average_score = score_sum as f64 / records.len() as f64;
    for issue in records.iter().flat_map(|r| &r.report.issues) {
        *summary
            .type_counts
            .entry(issue.kind.to_string())
            .or_insert(0) += 1;
        *summary
            .severity_counts
            .entry(issue.severity.to_string())
            .or_insert(0) += 1;
    }
    summary
}

/// Write records as JSON Lines
pub fn write_records(path: &Path, records: &[BatchRecord]) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record).context("Failed to serialize record")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read `input`, validate every item and optionally write the records to `output`.
pub fn process_file(
    engine: &GuardEngine,
    input: &Path,
    output: Option<&Path>,
    config: &GuardConfig,
    parallel: usize,
) -> Result<BatchSummary> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read batch file: {}", input.display()))?;
    let items = parse_items(&content);
    info!("Validating {} item(s) on {} thread(s)", items.len(), parallel.max(1));

    let records = run_batch(engine, &items, config, parallel)?;
    if let Some(out) = output {
        write_records(out, &records)?;
    }
    Ok(summarize(&records))
}
