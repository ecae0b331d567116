use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::error::AggregateError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AggregationSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (skipped rows/values, empty input).
    Warning,
    /// Error-level event (run failed).
    Error,
    /// Critical error (the input could not be read).
    Critical,
}

/// Context about an aggregation run.
#[derive(Debug, Clone, Default)]
pub struct AggregationContext {
    /// Input path or glob pattern; `None` when reading from an arbitrary reader.
    pub path: Option<PathBuf>,
}

impl AggregationContext {
    fn describe(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<reader>".to_string())
    }
}

/// Counters reported on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Number of input files read.
    pub files: usize,
    /// Physical lines read, headers and blank lines included.
    pub lines_read: usize,
    /// Data rows seen (header excluded, malformed rows included).
    pub rows_read: usize,
    /// Rows dropped by row filters.
    pub rows_filtered: usize,
    /// Rows folded into the aggregates.
    pub rows_folded: usize,
    /// Rows skipped as malformed.
    pub rows_skipped: usize,
    /// Values skipped on type mismatch.
    pub values_skipped: usize,
}

/// Observer interface for aggregation outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait AggregationObserver: Send + Sync {
    /// Called when a run succeeds.
    fn on_success(&self, _ctx: &AggregationContext, _stats: RunStats) {}

    /// Called for every skipped row or value, as it happens.
    fn on_diagnostic(&self, _ctx: &AggregationContext, _diagnostic: &Diagnostic) {}

    /// Called when a run succeeds without folding any row.
    fn on_empty_input(&self, _ctx: &AggregationContext) {}

    /// Called when a run fails.
    fn on_failure(&self, _ctx: &AggregationContext, _severity: AggregationSeverity, _error: &AggregateError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn AggregationObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn AggregationObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl AggregationObserver for CompositeObserver {
    fn on_success(&self, ctx: &AggregationContext, stats: RunStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_diagnostic(&self, ctx: &AggregationContext, diagnostic: &Diagnostic) {
        for o in &self.observers {
            o.on_diagnostic(ctx, diagnostic);
        }
    }

    fn on_empty_input(&self, ctx: &AggregationContext) {
        for o in &self.observers {
            o.on_empty_input(ctx);
        }
    }

    fn on_failure(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs aggregation events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl AggregationObserver for StdErrObserver {
    fn on_success(&self, ctx: &AggregationContext, stats: RunStats) {
        eprintln!(
            "[aggregate][ok] source={} files={} rows={} folded={} skipped_rows={} skipped_values={}",
            ctx.describe(),
            stats.files,
            stats.rows_read,
            stats.rows_folded,
            stats.rows_skipped,
            stats.values_skipped
        );
    }

    fn on_diagnostic(&self, ctx: &AggregationContext, diagnostic: &Diagnostic) {
        eprintln!("[aggregate][Warning] source={} {diagnostic}", ctx.describe());
    }

    fn on_empty_input(&self, ctx: &AggregationContext) {
        eprintln!("[aggregate][Warning] source={} no valid rows", ctx.describe());
    }

    fn on_failure(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        eprintln!("[aggregate][{severity:?}] source={} err={error}", ctx.describe());
    }

    fn on_alert(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        eprintln!("[ALERT][aggregate][{severity:?}] source={} err={error}", ctx.describe());
    }
}

/// Appends aggregation events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl AggregationObserver for FileObserver {
    fn on_success(&self, ctx: &AggregationContext, stats: RunStats) {
        self.append_line(&format!(
            "{} ok source={} files={} rows={} folded={} filtered={}",
            unix_ts(),
            ctx.describe(),
            stats.files,
            stats.rows_read,
            stats.rows_folded,
            stats.rows_filtered
        ));
    }

    fn on_diagnostic(&self, ctx: &AggregationContext, diagnostic: &Diagnostic) {
        self.append_line(&format!("{} warn source={} {diagnostic}", unix_ts(), ctx.describe()));
    }

    fn on_empty_input(&self, ctx: &AggregationContext) {
        self.append_line(&format!("{} warn source={} no valid rows", unix_ts(), ctx.describe()));
    }

    fn on_failure(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        self.append_line(&format!(
            "{} fail severity={severity:?} source={} err={error}",
            unix_ts(),
            ctx.describe()
        ));
    }

    fn on_alert(&self, ctx: &AggregationContext, severity: AggregationSeverity, error: &AggregateError) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} source={} err={error}",
            unix_ts(),
            ctx.describe()
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
