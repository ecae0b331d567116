//! Public aggregation entrypoints.
//!
//! - [`aggregate_reader`] aggregates any [`BufRead`] source
//! - [`aggregate_path`] opens one file and aggregates it
//! - [`aggregate_glob`] folds every file matching a glob pattern into one report
//!
//! If an [`AggregationObserver`](super::AggregationObserver) is set in the options, diagnostics
//! are reported as they are found and success/failure/alerts once the run ends.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{AggregateError, AggregateResult};

use super::observability::{AggregationContext, AggregationSeverity};
use super::options::AggregateOptions;
use super::run::{AggregateReport, Run};

/// Aggregate CSV text from a reader.
///
/// # Examples
///
/// ```rust
/// use csv_aggregate::pipeline::{AggregateOptions, aggregate_reader};
/// use csv_aggregate::types::Value;
///
/// # fn main() -> Result<(), csv_aggregate::AggregateError> {
/// let input = "a,b\n1,2\nbad\n3,4\n";
/// let report = aggregate_reader(input.as_bytes(), &AggregateOptions::default())?;
///
/// assert_eq!(report.diagnostics.rows_skipped(), 1);
/// assert_eq!(report.diagnostics.entries()[0].row, 2);
/// let a = report.snapshot.column("a").unwrap();
/// assert_eq!((a.count, a.sum), (2, 4.0));
/// assert_eq!(a.max, Some(Value::Int64(3)));
/// # Ok(())
/// # }
/// ```
pub fn aggregate_reader<R: BufRead>(reader: R, options: &AggregateOptions) -> AggregateResult<AggregateReport> {
    let ctx = AggregationContext::default();
    let result = Run::new(options, &ctx).and_then(|mut run| {
        run.feed(reader, None)?;
        run.finish()
    });
    observe(&ctx, options, result)
}

/// Aggregate one CSV file.
///
/// The file is opened once, read sequentially, and closed when this function returns, on every
/// path. A missing or unreadable file is [`AggregateError::Io`].
///
/// ```no_run
/// use std::sync::Arc;
///
/// use csv_aggregate::aggregate::AggregateSpec;
/// use csv_aggregate::pipeline::{AggregateOptions, StdErrObserver, aggregate_path};
///
/// # fn main() -> Result<(), csv_aggregate::AggregateError> {
/// let opts = AggregateOptions {
///     spec: AggregateSpec {
///         group_by: Some("renderer".to_string()),
///         ..Default::default()
///     },
///     observer: Some(Arc::new(StdErrObserver)),
///     ..Default::default()
/// };
/// let report = aggregate_path("renders.csv", &opts)?;
/// println!("groups={}", report.snapshot.groups.len());
/// # Ok(())
/// # }
/// ```
pub fn aggregate_path(path: impl AsRef<Path>, options: &AggregateOptions) -> AggregateResult<AggregateReport> {
    let path = path.as_ref();
    let ctx = AggregationContext {
        path: Some(path.to_path_buf()),
    };
    let result = Run::new(options, &ctx).and_then(|mut run| {
        let file = File::open(path)?;
        run.feed(BufReader::new(file), Some(path))?;
        run.finish()
    });
    observe(&ctx, options, result)
}

/// Aggregate every file matching `pattern` (sorted by path) into one report.
///
/// All files must share the first file's header. No match is [`AggregateError::NoInputFiles`].
pub fn aggregate_glob(pattern: &str, options: &AggregateOptions) -> AggregateResult<AggregateReport> {
    let ctx = AggregationContext {
        path: Some(PathBuf::from(pattern)),
    };
    let result = matching_files(pattern).and_then(|paths| {
        let mut run = Run::new(options, &ctx)?;
        for path in &paths {
            let file = File::open(path)?;
            run.feed(BufReader::new(file), Some(path))?;
        }
        run.finish()
    });
    observe(&ctx, options, result)
}

fn matching_files(pattern: &str) -> AggregateResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry.map_err(glob::GlobError::into_error)?;
        if path.is_file() {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        return Err(AggregateError::NoInputFiles {
            pattern: pattern.to_string(),
        });
    }
    paths.sort();
    Ok(paths)
}

fn observe(
    ctx: &AggregationContext,
    options: &AggregateOptions,
    result: AggregateResult<AggregateReport>,
) -> AggregateResult<AggregateReport> {
    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(report) => {
                if report.is_empty() {
                    obs.on_empty_input(ctx);
                }
                obs.on_success(ctx, report.stats);
            }
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
    result
}

/// Severity used when reporting a failed run.
///
/// Failing to read an input is critical; every other failure is a usage error.
pub fn severity_for_error(e: &AggregateError) -> AggregationSeverity {
    match e {
        AggregateError::Io(_) => AggregationSeverity::Critical,
        AggregateError::Csv(_)
        | AggregateError::Json(_)
        | AggregateError::Glob(_)
        | AggregateError::NoInputFiles { .. }
        | AggregateError::SchemaMismatch { .. }
        | AggregateError::MalformedHeader { .. }
        | AggregateError::InvalidOptions { .. } => AggregationSeverity::Error,
    }
}
