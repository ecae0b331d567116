//! Recoverable problems collected during a run.

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use crate::error::RowError;

/// One recoverable problem, tied to the row it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// File the row was read from, when reading from a path.
    pub source: Option<PathBuf>,
    /// 1-based index of the data row (header excluded).
    pub row: usize,
    /// 1-based physical line number.
    pub line: usize,
    /// What went wrong.
    #[serde(serialize_with = "serialize_display")]
    pub error: RowError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.source {
            write!(f, "{}:", path.display())?;
        }
        write!(f, "{} (row {}): {}", self.line, self.row, self.error)
    }
}

/// Diagnostics returned alongside the aggregates.
///
/// Counters always reflect every problem; `entries` holds at most `limit` of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    rows_skipped: usize,
    values_skipped: usize,
    empty_input: bool,
    #[serde(skip)]
    limit: Option<usize>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Diagnostics {
    /// Create an empty list keeping at most `limit` entries (`None` for no cap).
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            rows_skipped: 0,
            values_skipped: 0,
            empty_input: false,
            limit,
        }
    }

    /// Record a problem.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.error.is_row_skip() {
            self.rows_skipped += 1;
        } else {
            self.values_skipped += 1;
        }
        if self.limit.is_none_or(|limit| self.entries.len() < limit) {
            self.entries.push(diagnostic);
        }
    }

    /// Flag that no valid row was folded.
    pub fn mark_empty_input(&mut self) {
        self.empty_input = true;
    }

    /// Stored entries, in the order they were found.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Rows skipped entirely (malformed).
    pub fn rows_skipped(&self) -> usize {
        self.rows_skipped
    }

    /// Individual values skipped (type mismatches).
    pub fn values_skipped(&self) -> usize {
        self.values_skipped
    }

    /// Whether the run folded zero rows.
    pub fn is_empty_input(&self) -> bool {
        self.empty_input
    }

    /// Whether nothing at all was reported.
    pub fn is_clean(&self) -> bool {
        self.rows_skipped == 0 && self.values_skipped == 0 && !self.empty_input
    }

    /// Number of entries dropped because of the limit.
    pub fn truncated(&self) -> usize {
        self.rows_skipped + self.values_skipped - self.entries.len()
    }
}

fn serialize_display<S: Serializer, T: fmt::Display>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, Diagnostics};
    use crate::error::{MalformedRow, RowError};
    use crate::types::DataType;

    fn malformed(row: usize) -> Diagnostic {
        Diagnostic {
            source: None,
            row,
            line: row + 1,
            error: MalformedRow::FieldCount {
                expected: 2,
                found: 1,
            }
            .into(),
        }
    }

    fn mismatch(row: usize) -> Diagnostic {
        Diagnostic {
            source: None,
            row,
            line: row + 1,
            error: RowError::TypeMismatch {
                column: "b".to_string(),
                expected: DataType::Int64,
                raw: "x".to_string(),
            },
        }
    }

    #[test]
    fn counts_row_and_value_skips_separately() {
        let mut d = Diagnostics::default();
        d.push(malformed(2));
        d.push(mismatch(3));
        d.push(mismatch(4));
        assert_eq!(d.rows_skipped(), 1);
        assert_eq!(d.values_skipped(), 2);
        assert_eq!(d.entries().len(), 3);
        assert!(!d.is_clean());
    }

    #[test]
    fn limit_caps_entries_but_not_counters() {
        let mut d = Diagnostics::new(Some(1));
        d.push(malformed(1));
        d.push(malformed(2));
        assert_eq!(d.entries().len(), 1);
        assert_eq!(d.rows_skipped(), 2);
        assert_eq!(d.truncated(), 1);
    }

    #[test]
    fn display_includes_location() {
        let text = malformed(2).to_string();
        assert_eq!(text, "3 (row 2): malformed row: expected 2 fields, found 1");
    }
}
