//! Aggregation runs over files and readers.
//!
//! Most callers should use [`aggregate_path`] (from [`unified`]) which:
//!
//! - opens the file and streams it line by line through the tokenizer, typer and aggregator
//! - collects skipped rows/values as [`crate::diagnostics::Diagnostics`] instead of failing
//! - optionally reports diagnostics, success, failure and alerts to an [`AggregationObserver`]
//!
//! Run settings live in [`AggregateOptions`]; [`AggregateConfig`] loads them from JSON.

pub mod config;
pub mod observability;
pub mod options;
mod run;
pub mod unified;

pub use config::AggregateConfig;
pub use observability::{
    AggregationContext, AggregationObserver, AggregationSeverity, CompositeObserver, FileObserver, RunStats,
    StdErrObserver,
};
pub use options::{AggregateOptions, RowFilter};
pub use run::AggregateReport;
pub use unified::{aggregate_glob, aggregate_path, aggregate_reader, severity_for_error};
