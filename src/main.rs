use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use csv_aggregate::aggregate::AggregateKind;
use csv_aggregate::pipeline::{
    AggregateConfig, AggregateOptions, AggregationObserver, CompositeObserver, FileObserver, RowFilter, StdErrObserver,
    aggregate_glob, aggregate_path,
};
use csv_aggregate::report::{ReportFormat, write_report};
use csv_aggregate::types::DataType;

#[derive(Parser)]
#[command(name = "csv-aggregate", version, about = "Aggregate statistics over CSV files")]
/// Computes count/sum/mean/min/max/distinct per column of a CSV file.
struct Args {
    /// CSV file, directory of `.csv` files, or glob pattern (with --glob).
    path: PathBuf,
    /// Field delimiter.
    #[arg(short, long)]
    delimiter: Option<char>,
    /// Quote character.
    #[arg(short, long)]
    quote: Option<char>,
    /// The first line is data, not a header.
    #[arg(long)]
    no_header: bool,
    /// Drop whitespace around unquoted fields.
    #[arg(long)]
    trim: bool,
    /// Aggregate per distinct value of this column.
    #[arg(short, long)]
    group_by: Option<String>,
    /// Report this column's value for the rows holding each min and max.
    #[arg(short, long)]
    label: Option<String>,
    /// Statistics to report: count,sum,mean,min,max,distinct (default: all).
    #[arg(short, long, value_delimiter = ',')]
    aggregate: Vec<String>,
    /// Only fold rows where COLUMN equals VALUE (repeatable).
    #[arg(short, long = "filter", value_name = "COLUMN=VALUE")]
    filters: Vec<String>,
    /// Declare a column type: COLUMN=int|float|string (repeatable).
    #[arg(short = 't', long = "type", value_name = "COLUMN=TYPE")]
    types: Vec<String>,
    /// Treat PATH as a glob pattern matching several files.
    #[arg(long)]
    glob: bool,
    /// Output format: text, json or csv.
    #[arg(long, default_value = "text")]
    format: String,
    /// JSON file with default options; flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Append run events to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Do not print skipped rows to stderr.
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// Returns whether at least one row was aggregated.
fn run(args: &Args) -> Result<bool> {
    let format = ReportFormat::from_name(&args.format)
        .ok_or_else(|| anyhow!("unknown output format '{}'", args.format))?;
    let opts = build_options(args)?;

    let report = if args.glob {
        let pattern = args.path.to_string_lossy();
        aggregate_glob(&pattern, &opts)?
    } else if args.path.is_dir() {
        aggregate_glob(&dir_pattern(&args.path), &opts)?
    } else {
        aggregate_path(&args.path, &opts)
            .with_context(|| format!("cannot aggregate {}", args.path.display()))?
    };

    write_report(&report, format, std::io::stdout().lock())?;

    let d = &report.diagnostics;
    if d.rows_skipped() > 0 || d.values_skipped() > 0 {
        eprintln!(
            "warning: skipped {} malformed rows and {} mismatched values",
            d.rows_skipped(),
            d.values_skipped()
        );
        if d.truncated() > 0 {
            eprintln!("warning: {} further diagnostics not kept", d.truncated());
        }
    }
    if report.is_empty() {
        eprintln!("warning: no valid rows in {}", args.path.display());
        return Ok(false);
    }
    Ok(true)
}

fn build_options(args: &Args) -> Result<AggregateOptions> {
    let mut opts = AggregateOptions::default();
    if let Some(path) = &args.config {
        AggregateConfig::from_path(path)
            .with_context(|| format!("cannot load config {}", path.display()))?
            .apply(&mut opts);
    }

    if let Some(d) = args.delimiter {
        opts.tokenizer.delimiter = d;
    }
    if let Some(q) = args.quote {
        opts.tokenizer.quote = q;
    }
    if args.trim {
        opts.tokenizer.trim = true;
    }
    if args.no_header {
        opts.has_headers = false;
    }
    if args.group_by.is_some() {
        opts.spec.group_by = args.group_by.clone();
    }
    if args.label.is_some() {
        opts.spec.label = args.label.clone();
    }
    if !args.aggregate.is_empty() {
        opts.spec.aggregates = args
            .aggregate
            .iter()
            .map(|name| AggregateKind::from_name(name).ok_or_else(|| anyhow!("unknown aggregate '{name}'")))
            .collect::<Result<_>>()?;
    }
    for f in &args.filters {
        let filter = RowFilter::parse(f).ok_or_else(|| anyhow!("filter must look like COLUMN=VALUE, got '{f}'"))?;
        opts.filters.push(filter);
    }
    for t in &args.types {
        let (column, ty) = t
            .split_once('=')
            .ok_or_else(|| anyhow!("type must look like COLUMN=TYPE, got '{t}'"))?;
        let data_type = DataType::from_name(ty).ok_or_else(|| anyhow!("unknown type '{ty}' for column '{column}'"))?;
        opts.declare(column, data_type);
    }

    let mut observers: Vec<Arc<dyn AggregationObserver>> = Vec::new();
    if !args.quiet {
        observers.push(Arc::new(StdErrObserver));
    }
    if let Some(path) = &args.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    if !observers.is_empty() {
        opts.observer = Some(Arc::new(CompositeObserver::new(observers)));
    }
    Ok(opts)
}

fn dir_pattern(dir: &Path) -> String {
    format!("{}/*.csv", glob::Pattern::escape(&dir.to_string_lossy()))
}
