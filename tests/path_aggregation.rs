use std::fs;
use std::sync::{Arc, Mutex};

use csv_aggregate::aggregate::AggregateSpec;
use csv_aggregate::diagnostics::Diagnostic;
use csv_aggregate::error::{AggregateError, RowError};
use csv_aggregate::pipeline::{
    AggregateOptions, AggregationContext, AggregationObserver, AggregationSeverity, FileObserver, RowFilter, RunStats,
    aggregate_glob, aggregate_path,
};
use csv_aggregate::types::{DataType, Value};

const DAY1: &str = "tests/fixtures/renders_2024-01-01.csv";
const ALL_DAYS: &str = "tests/fixtures/renders_*.csv";

fn utf8(s: &str) -> Value {
    Value::Utf8(s.to_string())
}

#[test]
fn aggregate_path_happy_path() {
    let opts = AggregateOptions {
        spec: AggregateSpec {
            label: Some("uid".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let report = aggregate_path(DAY1, &opts).unwrap();

    assert_eq!(report.stats.files, 1);
    assert_eq!(report.stats.rows_folded, 4);
    assert!(report.diagnostics.is_clean());

    let time = report.snapshot.column("render_time").unwrap();
    assert_eq!(time.data_type, Some(DataType::Int64));
    assert_eq!((time.count, time.sum), (3, 11_000.0));
    assert_eq!(time.min, Some(Value::Int64(1000)));
    assert_eq!(time.max, Some(Value::Int64(6000)));

    let ram = report.snapshot.column("peak_ram").unwrap();
    assert_eq!(ram.data_type, Some(DataType::Float64));
    assert_eq!(ram.max, Some(Value::Float64(8.0)));
    assert_eq!(ram.max_label, Some(utf8("r2")));
    assert_eq!(ram.min_label, Some(utf8("r4")));

    let cpu = report.snapshot.column("peak_cpu").unwrap();
    assert_eq!(cpu.sum, 215.5);
    assert_eq!(cpu.max_label, Some(utf8("r2")));

    let success = report.snapshot.column("success").unwrap();
    assert_eq!(success.distinct.get(&utf8("true")), Some(&3));
    assert_eq!(success.distinct.get(&utf8("false")), Some(&1));
}

#[test]
fn filters_select_successful_renders() {
    let opts = AggregateOptions {
        filters: vec![RowFilter::new("success", "true"), RowFilter::new("app", "maya")],
        ..Default::default()
    };
    let report = aggregate_path(DAY1, &opts).unwrap();
    assert_eq!(report.stats.rows_filtered, 2);
    let time = report.snapshot.column("render_time").unwrap();
    assert_eq!((time.count, time.sum), (2, 10_000.0));
}

#[test]
fn group_by_renderer() {
    let opts = AggregateOptions {
        spec: AggregateSpec {
            group_by: Some("renderer".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let report = aggregate_path(DAY1, &opts).unwrap();

    let keys: Vec<_> = report.snapshot.groups.iter().map(|g| g.key.clone()).collect();
    assert_eq!(keys, vec![utf8("arnold"), utf8("mantra"), utf8("redshift")]);

    let arnold = report.snapshot.group(&utf8("arnold")).unwrap();
    assert_eq!(arnold.rows, 2);
    assert_eq!(arnold.column("render_time").unwrap().sum, 5_000.0);
    assert!(arnold.column("renderer").is_none());

    let mantra = report.snapshot.group(&utf8("mantra")).unwrap();
    assert_eq!(mantra.column("render_time").unwrap().count, 0);
}

#[test]
fn glob_folds_every_matching_file() {
    let report = aggregate_glob(ALL_DAYS, &AggregateOptions::default()).unwrap();

    assert_eq!(report.stats.files, 2);
    assert_eq!(report.stats.rows_read, 8);
    assert_eq!(report.stats.rows_folded, 7);
    assert_eq!(report.stats.rows_skipped, 1);
    assert_eq!(report.stats.values_skipped, 1);

    let time = report.snapshot.column("render_time").unwrap();
    assert_eq!((time.count, time.sum), (6, 25_000.0));
    let frames = report.snapshot.column("num_frames").unwrap();
    assert_eq!((frames.count, frames.sum), (5, 74.0));

    let entries = report.diagnostics.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].source.as_ref().unwrap().ends_with("renders_2024-01-02.csv"));
    assert_eq!((entries[0].row, entries[0].line), (3, 4));
    assert!(matches!(&entries[0].error, RowError::TypeMismatch { column, .. } if column == "num_frames"));
    assert_eq!((entries[1].row, entries[1].line), (4, 5));
    assert!(entries[1].error.is_row_skip());
}

#[test]
fn glob_without_matches_is_an_error() {
    let err = aggregate_glob("tests/fixtures/nothing_*.csv", &AggregateOptions::default()).unwrap_err();
    assert!(matches!(err, AggregateError::NoInputFiles { .. }));
}

#[test]
fn glob_rejects_differing_headers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "x,y\n1,2\n").unwrap();
    fs::write(dir.path().join("b.csv"), "x,z\n3,4\n").unwrap();

    let pattern = format!("{}/*.csv", dir.path().display());
    let err = aggregate_glob(&pattern, &AggregateOptions::default()).unwrap_err();
    assert!(err.to_string().contains("differs from the first input"));
}

#[test]
fn glob_accepts_headers_differing_only_by_byte_order_mark() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.csv"), "\u{feff}x,y\n1,2\n").unwrap();
    fs::write(dir.path().join("b.csv"), "x,y\n3,4\n").unwrap();

    let pattern = format!("{}/*.csv", dir.path().display());
    let report = aggregate_glob(&pattern, &AggregateOptions::default()).unwrap();
    assert_eq!(report.snapshot.column("x").unwrap().sum, 4.0);
}

#[test]
fn missing_file_is_io_error() {
    let err = aggregate_path("tests/fixtures/does_not_exist.csv", &AggregateOptions::default()).unwrap_err();
    assert!(matches!(err, AggregateError::Io(_)));
}

#[test]
fn header_only_file_is_empty_input() {
    let report = aggregate_path("tests/fixtures/header_only.csv", &AggregateOptions::default()).unwrap();
    assert!(report.is_empty());
    assert_eq!(report.snapshot.columns.len(), 2);
}

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<RunStats>>,
    diagnostics: Mutex<Vec<usize>>,
    empty: Mutex<usize>,
    failures: Mutex<Vec<AggregationSeverity>>,
    alerts: Mutex<Vec<AggregationSeverity>>,
}

impl AggregationObserver for RecordingObserver {
    fn on_success(&self, _ctx: &AggregationContext, stats: RunStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_diagnostic(&self, _ctx: &AggregationContext, diagnostic: &Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic.row);
    }

    fn on_empty_input(&self, _ctx: &AggregationContext) {
        *self.empty.lock().unwrap() += 1;
    }

    fn on_failure(&self, _ctx: &AggregationContext, severity: AggregationSeverity, _error: &AggregateError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &AggregationContext, severity: AggregationSeverity, _error: &AggregateError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn observed(obs: &Arc<RecordingObserver>) -> AggregateOptions {
    AggregateOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: AggregationSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_sees_diagnostics_and_success() {
    let obs = Arc::new(RecordingObserver::default());
    aggregate_glob(ALL_DAYS, &observed(&obs)).unwrap();

    assert_eq!(*obs.diagnostics.lock().unwrap(), vec![3, 4]);
    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].rows_folded, 7);
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_and_alert_on_missing_file() {
    let obs = Arc::new(RecordingObserver::default());
    let _ = aggregate_path("tests/fixtures/does_not_exist.csv", &observed(&obs)).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![AggregationSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![AggregationSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_unknown_column() {
    let obs = Arc::new(RecordingObserver::default());
    let mut opts = observed(&obs);
    opts.spec.group_by = Some("definitely_missing".to_string());
    let _ = aggregate_path(DAY1, &opts).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![AggregationSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn observer_is_told_about_empty_input() {
    let obs = Arc::new(RecordingObserver::default());
    aggregate_path("tests/fixtures/header_only.csv", &observed(&obs)).unwrap();
    assert_eq!(*obs.empty.lock().unwrap(), 1);
    assert_eq!(obs.successes.lock().unwrap().len(), 1);
}

#[test]
fn file_observer_appends_events() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runs.log");
    let opts = AggregateOptions {
        observer: Some(Arc::new(FileObserver::new(&log))),
        ..Default::default()
    };

    aggregate_path(DAY1, &opts).unwrap();
    let _ = aggregate_path(dir.path().join("missing.csv"), &opts).unwrap_err();

    let text = fs::read_to_string(&log).unwrap();
    let lines: Vec<_> = text.lines().collect();
    // success, then failure followed by its alert (default threshold is Critical)
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(" ok source="));
    assert!(lines[0].contains("folded=4"));
    assert!(lines[1].contains(" fail severity=Critical"));
    assert!(lines[2].contains(" ALERT severity=Critical"));
}
