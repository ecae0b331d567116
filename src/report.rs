//! Rendering finished reports as text, JSON or CSV.
//!
//! Only the statistics listed in the snapshot's requested aggregates are printed.

use std::io::Write;

use serde::Serialize;

use crate::aggregate::{AggregateKind, AggregateSnapshot, AggregateState};
use crate::error::AggregateResult;
use crate::pipeline::AggregateReport;
use crate::types::Value;

/// Output format for [`write_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// The whole report as pretty-printed JSON.
    Json,
    /// One CSV line per column (and per group).
    Csv,
}

impl ReportFormat {
    /// Parse a format name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Write `report` to `out` in `format`.
pub fn write_report<W: Write>(report: &AggregateReport, format: ReportFormat, out: W) -> AggregateResult<()> {
    match format {
        ReportFormat::Text => write_text(report, out),
        ReportFormat::Json => write_json(report, out),
        ReportFormat::Csv => write_csv(&report.snapshot, out),
    }
}

/// Pretty-printed JSON of the whole report.
pub fn write_json<W: Write>(report: &AggregateReport, mut out: W) -> AggregateResult<()> {
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}

/// One flat line per column, suitable for spreadsheets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub group: Option<String>,
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    pub count: Option<u64>,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<String>,
    pub min_label: Option<String>,
    pub max: Option<String>,
    pub max_label: Option<String>,
    pub distinct: Option<usize>,
}

/// Flatten a snapshot: overall columns first, then each group's columns.
pub fn summary_rows(snapshot: &AggregateSnapshot) -> Vec<SummaryRow> {
    let overall = snapshot
        .columns
        .iter()
        .map(|c| summary_row(snapshot, None, &c.name, &c.state));
    let grouped = snapshot.groups.iter().flat_map(|g| {
        g.columns
            .iter()
            .map(move |c| summary_row(snapshot, Some(&g.key), &c.name, &c.state))
    });
    overall.chain(grouped).collect()
}

fn summary_row(snapshot: &AggregateSnapshot, group: Option<&Value>, column: &str, s: &AggregateState) -> SummaryRow {
    let numeric = s.data_type.is_some_and(|dt| dt.is_numeric());
    let want = |kind| snapshot.wants(kind);
    let text = |v: &Option<Value>| v.as_ref().map(Value::to_string);
    SummaryRow {
        group: group.map(Value::to_string),
        column: column.to_string(),
        data_type: s.data_type.map(|dt| dt.to_string()),
        count: want(AggregateKind::Count).then_some(s.count),
        sum: (want(AggregateKind::Sum) && numeric).then_some(s.sum),
        mean: want(AggregateKind::Mean).then(|| s.mean()).flatten(),
        min: want(AggregateKind::Min).then(|| text(&s.min)).flatten(),
        min_label: want(AggregateKind::Min).then(|| text(&s.min_label)).flatten(),
        max: want(AggregateKind::Max).then(|| text(&s.max)).flatten(),
        max_label: want(AggregateKind::Max).then(|| text(&s.max_label)).flatten(),
        distinct: want(AggregateKind::Distinct).then(|| s.distinct_count()),
    }
}

/// CSV with a header line and one [`SummaryRow`] per line.
pub fn write_csv<W: Write>(snapshot: &AggregateSnapshot, out: W) -> AggregateResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in summary_rows(snapshot) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Human-readable report.
pub fn write_text<W: Write>(report: &AggregateReport, mut out: W) -> AggregateResult<()> {
    let snapshot = &report.snapshot;
    let stats = &report.stats;
    writeln!(
        out,
        "rows: {} folded, {} skipped, {} filtered ({} values skipped)",
        stats.rows_folded, stats.rows_skipped, stats.rows_filtered, stats.values_skipped
    )?;

    for c in &snapshot.columns {
        write_column(&mut out, snapshot, "", &c.name, &c.state)?;
    }
    if let Some(group_by) = &snapshot.group_by {
        for g in &snapshot.groups {
            writeln!(out, "group {group_by}={} ({} rows)", display_or_missing(&g.key), g.rows)?;
            for c in &g.columns {
                write_column(&mut out, snapshot, "  ", &c.name, &c.state)?;
            }
        }
    }
    Ok(())
}

fn write_column<W: Write>(
    out: &mut W,
    snapshot: &AggregateSnapshot,
    indent: &str,
    name: &str,
    s: &AggregateState,
) -> AggregateResult<()> {
    let mut parts = Vec::new();
    for row_kind in AggregateKind::ALL {
        if !snapshot.wants(row_kind) {
            continue;
        }
        match row_kind {
            AggregateKind::Count => parts.push(format!("count={}", s.count)),
            AggregateKind::Sum => {
                if s.data_type.is_some_and(|dt| dt.is_numeric()) {
                    parts.push(format!("sum={}", s.sum));
                }
            }
            AggregateKind::Mean => {
                if let Some(mean) = s.mean() {
                    parts.push(format!("mean={mean}"));
                }
            }
            AggregateKind::Min => {
                if let Some(v) = &s.min {
                    parts.push(format!("min={}{}", v, label_suffix(&s.min_label)));
                }
            }
            AggregateKind::Max => {
                if let Some(v) = &s.max {
                    parts.push(format!("max={}{}", v, label_suffix(&s.max_label)));
                }
            }
            AggregateKind::Distinct => parts.push(format!("distinct={}", s.distinct_count())),
        }
    }

    let ty = s.data_type.map_or_else(|| "empty".to_string(), |dt| dt.to_string());
    writeln!(out, "{indent}{name} ({ty}): {}", parts.join(" "))?;
    Ok(())
}

fn label_suffix(label: &Option<Value>) -> String {
    label
        .as_ref()
        .map(|l| format!(" [{}]", display_or_missing(l)))
        .unwrap_or_default()
}

fn display_or_missing(v: &Value) -> String {
    if v.is_null() {
        "<missing>".to_string()
    } else {
        v.to_string()
    }
}
