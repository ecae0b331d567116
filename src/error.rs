use thiserror::Error;

use crate::types::DataType;

/// Convenience result type for aggregation runs.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Fatal error returned by aggregation entrypoints.
///
/// Problems with individual rows never surface here; they are collected as
/// [`crate::diagnostics::Diagnostic`]s next to the aggregates.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV output error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON config or output error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The glob pattern used to select input files is invalid.
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// No input file matched the glob pattern.
    #[error("no input files match '{pattern}'")]
    NoInputFiles { pattern: String },

    /// The input does not match the requested columns (unknown group-by/filter/declared column,
    /// differing headers across files, incompatible states in a merge).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// The header line could not be split into column names.
    #[error("malformed header on line {line}: {reason}")]
    MalformedHeader { line: usize, reason: MalformedRow },

    /// The options cannot be used as given (e.g. delimiter equal to the quote character).
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },
}

/// Why a line could not be turned into a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRow {
    /// A quoted field was still open at the end of the line.
    #[error("unterminated quoted field starting at byte {offset}")]
    UnterminatedQuote { offset: usize },

    /// The line is not valid UTF-8 past byte `offset`.
    #[error("invalid UTF-8 after byte {offset}")]
    InvalidUtf8 { offset: usize },

    /// The row does not have one field per column.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// Recoverable, per-row error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The whole row was skipped.
    #[error("malformed row: {0}")]
    Malformed(#[from] MalformedRow),

    /// One column's value was skipped; the rest of the row was folded.
    #[error("type mismatch in column '{column}': expected {expected}, found '{raw}'")]
    TypeMismatch {
        column: String,
        expected: DataType,
        raw: String,
    },
}

impl RowError {
    /// Whether this error caused the whole row to be skipped.
    pub fn is_row_skip(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}
