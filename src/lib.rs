//! `csv-aggregate` computes aggregate statistics over delimited text files in a single pass.
//!
//! Each line goes through three stages:
//!
//! - [`tokenizer`]: split the line into raw fields (configurable delimiter and quote)
//! - [`typer`]: coerce fields into typed [`types::Value`]s, locking each column's type on first
//!   sight (or using a declared type)
//! - [`aggregate`]: fold the typed row into per-column [`aggregate::AggregateState`]s (count, sum,
//!   min, max, distinct counts), optionally per group
//!
//! Rows that cannot be split or have the wrong width are skipped; values that do not fit their
//! column's type are skipped. Both are collected as [`diagnostics::Diagnostics`] next to the
//! aggregates, never failing the run. Only fatal problems (unreadable file, unknown column, bad
//! options) are returned as [`AggregateError`].
//!
//! ## Quick example
//!
//! ```rust
//! use csv_aggregate::pipeline::{AggregateOptions, aggregate_reader};
//! use csv_aggregate::types::Value;
//!
//! # fn main() -> Result<(), csv_aggregate::AggregateError> {
//! let report = aggregate_reader("a,b\n1,2\n3,4\n".as_bytes(), &AggregateOptions::default())?;
//!
//! let b = report.snapshot.column("b").unwrap();
//! assert_eq!(b.count, 2);
//! assert_eq!(b.sum, 6.0);
//! assert_eq!(b.min, Some(Value::Int64(2)));
//! assert_eq!(b.max, Some(Value::Int64(4)));
//! assert!(report.diagnostics.is_clean());
//! # Ok(())
//! # }
//! ```
//!
//! ## Group-by with arg-max labels
//!
//! ```rust
//! use csv_aggregate::aggregate::{AggregateKind, AggregateSpec};
//! use csv_aggregate::pipeline::{AggregateOptions, aggregate_reader};
//! use csv_aggregate::types::Value;
//!
//! let input = "uid,renderer,peak_ram\n1,arnold,2.5\n2,redshift,8\n3,arnold,4\n";
//! let opts = AggregateOptions {
//!     spec: AggregateSpec {
//!         aggregates: vec![AggregateKind::Mean, AggregateKind::Max],
//!         group_by: Some("renderer".to_string()),
//!         label: Some("uid".to_string()),
//!     },
//!     ..Default::default()
//! };
//! let report = aggregate_reader(input.as_bytes(), &opts).unwrap();
//!
//! let ram = report.snapshot.column("peak_ram").unwrap();
//! assert_eq!(ram.max_label, Some(Value::Int64(2)));
//!
//! let arnold = report.snapshot.group(&Value::Utf8("arnold".to_string())).unwrap();
//! assert_eq!(arnold.column("peak_ram").unwrap().mean(), Some(3.25));
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: entrypoints ([`pipeline::aggregate_path`], [`pipeline::aggregate_glob`],
//!   [`pipeline::aggregate_reader`]), options, JSON config, observers
//! - [`report`]: text/JSON/CSV rendering
//! - [`error`] / [`diagnostics`]: fatal errors and recoverable problems

pub mod aggregate;
pub mod diagnostics;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod tokenizer;
pub mod typer;
pub mod types;

pub use error::{AggregateError, AggregateResult};
