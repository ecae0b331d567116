//! Single-pass driver: Tokenizer → row filters → Row Typer → Aggregator.

use std::io::BufRead;
use std::path::Path;

use serde::Serialize;

use crate::aggregate::{AggregateSnapshot, AggregateSpec, Aggregator};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{AggregateError, AggregateResult, MalformedRow, RowError};
use crate::tokenizer::{Records, Tokenizer};
use crate::typer::RowTyper;
use crate::types::{Field, Schema};

use super::observability::{AggregationContext, RunStats};
use super::options::AggregateOptions;

/// Everything a finished run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    /// Finalized aggregates.
    pub snapshot: AggregateSnapshot,
    /// Recoverable problems found along the way.
    pub diagnostics: Diagnostics,
    /// Run counters.
    pub stats: RunStats,
}

impl AggregateReport {
    /// Whether the run folded no rows at all.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty_input()
    }
}

// Column layout fixed by the first header (or first row without headers).
struct Layout {
    names: Vec<String>,
    filters: Vec<(usize, String)>,
    typer: RowTyper,
    aggregator: Aggregator,
}

/// Accumulates one or more inputs into a single report.
pub(crate) struct Run<'a> {
    opts: &'a AggregateOptions,
    ctx: &'a AggregationContext,
    tokenizer: Tokenizer,
    layout: Option<Layout>,
    diagnostics: Diagnostics,
    stats: RunStats,
}

impl<'a> Run<'a> {
    pub(crate) fn new(opts: &'a AggregateOptions, ctx: &'a AggregationContext) -> AggregateResult<Self> {
        Ok(Self {
            opts,
            ctx,
            tokenizer: Tokenizer::new(opts.tokenizer)?,
            layout: None,
            diagnostics: Diagnostics::new(opts.max_diagnostics),
            stats: RunStats::default(),
        })
    }

    /// Read `reader` to the end, folding every valid row.
    pub(crate) fn feed<R: BufRead>(&mut self, reader: R, source: Option<&Path>) -> AggregateResult<()> {
        log::debug!(
            "aggregating {}",
            source.map_or_else(|| "<reader>".to_string(), |p| p.display().to_string())
        );
        self.stats.files += 1;

        let mut records = Records::new(reader, self.tokenizer);
        let mut header_pending = self.opts.has_headers;
        let mut data_row = 0;

        for record in records.by_ref() {
            let record = record?;

            if header_pending {
                header_pending = false;
                let names = record.fields.map_err(|reason| AggregateError::MalformedHeader {
                    line: record.line,
                    reason,
                })?;
                self.set_layout(names, source)?;
                continue;
            }

            data_row += 1;
            self.stats.rows_read += 1;

            let fields = match record.fields {
                Ok(fields) => fields,
                Err(e) => {
                    self.report(source, data_row, record.line, e.into());
                    continue;
                }
            };

            if self.layout.is_none() {
                let names = (1..=fields.len()).map(|i| format!("column_{i}")).collect();
                self.set_layout(names, source)?;
            }
            let layout = self
                .layout
                .as_mut()
                .expect("layout is set from the header or the first row");

            if fields.len() != layout.names.len() {
                let err = MalformedRow::FieldCount {
                    expected: layout.names.len(),
                    found: fields.len(),
                };
                self.report(source, data_row, record.line, err.into());
                continue;
            }

            if !layout.filters.iter().all(|(idx, want)| fields[*idx] == *want) {
                self.stats.rows_filtered += 1;
                continue;
            }

            let typed = layout.typer.type_row(&fields);
            layout.aggregator.fold(&typed.values);
            self.stats.rows_folded += 1;
            for err in typed.errors {
                self.report(source, data_row, record.line, err);
            }
        }

        self.stats.lines_read += records.lines_read();
        Ok(())
    }

    fn set_layout(&mut self, names: Vec<String>, source: Option<&Path>) -> AggregateResult<()> {
        if let Some(layout) = &self.layout {
            if layout.names != names {
                return Err(AggregateError::SchemaMismatch {
                    message: format!(
                        "header of {} differs from the first input: {:?} vs {:?}",
                        source.map_or_else(|| "<reader>".to_string(), |p| p.display().to_string()),
                        names,
                        layout.names
                    ),
                });
            }
            return Ok(());
        }

        for declared in &self.opts.declared {
            if !names.contains(&declared.name) {
                return Err(AggregateError::SchemaMismatch {
                    message: format!(
                        "declared column '{}' not found. headers={names:?}",
                        declared.name
                    ),
                });
            }
        }

        let mut filters = Vec::with_capacity(self.opts.filters.len());
        for filter in &self.opts.filters {
            match names.iter().position(|n| *n == filter.column) {
                Some(idx) => filters.push((idx, filter.equals.clone())),
                None => {
                    return Err(AggregateError::SchemaMismatch {
                        message: format!(
                            "unknown filter column '{}'. headers={names:?}",
                            filter.column
                        ),
                    });
                }
            }
        }

        let schema = Schema::new(
            names
                .iter()
                .map(|name| match self.opts.declared_type(name) {
                    Some(dt) => Field::new(name.clone(), dt),
                    None => Field::inferred(name.clone()),
                })
                .collect(),
        );

        self.layout = Some(Layout {
            typer: RowTyper::new(&schema),
            aggregator: Aggregator::new(names.clone(), &self.opts.spec)?,
            filters,
            names,
        });
        Ok(())
    }

    fn report(&mut self, source: Option<&Path>, row: usize, line: usize, error: RowError) {
        let diagnostic = Diagnostic {
            source: source.map(Path::to_path_buf),
            row,
            line,
            error,
        };
        log::warn!("skipped: {diagnostic}");
        if let Some(obs) = self.opts.observer.as_ref() {
            obs.on_diagnostic(self.ctx, &diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    /// Finalize the aggregates. Zero folded rows is flagged as empty input, not an error.
    pub(crate) fn finish(mut self) -> AggregateResult<AggregateReport> {
        let snapshot = match self.layout {
            Some(layout) => layout.aggregator.finalize(),
            // Nothing at all was read: report zero columns.
            None => {
                let spec = AggregateSpec {
                    aggregates: self.opts.spec.aggregates.clone(),
                    group_by: None,
                    label: None,
                };
                Aggregator::new(Vec::new(), &spec)?.finalize()
            }
        };

        if snapshot.is_empty() {
            log::warn!("no valid rows were aggregated");
            self.diagnostics.mark_empty_input();
        }
        self.stats.rows_skipped = self.diagnostics.rows_skipped();
        self.stats.values_skipped = self.diagnostics.values_skipped();

        Ok(AggregateReport {
            snapshot,
            diagnostics: self.diagnostics,
            stats: self.stats,
        })
    }
}
