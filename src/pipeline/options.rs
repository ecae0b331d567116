use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::aggregate::AggregateSpec;
use crate::tokenizer::TokenizerOptions;
use crate::types::{DataType, Field};

use super::observability::{AggregationObserver, AggregationSeverity};

/// Keep only rows whose raw field in `column` equals `equals`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RowFilter {
    /// Column to compare.
    pub column: String,
    /// Expected raw (untyped) text.
    pub equals: String,
}

impl RowFilter {
    /// Create a filter.
    pub fn new(column: impl Into<String>, equals: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            equals: equals.into(),
        }
    }

    /// Parse `COLUMN=VALUE`.
    pub fn parse(s: &str) -> Option<Self> {
        let (column, equals) = s.split_once('=')?;
        (!column.is_empty()).then(|| Self::new(column, equals))
    }
}

/// Options controlling an aggregation run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct AggregateOptions {
    /// Delimiter, quote and trimming.
    pub tokenizer: TokenizerOptions,
    /// Treat the first non-empty line as a header. Without one, columns are named
    /// `column_1`, `column_2`, ...
    pub has_headers: bool,
    /// Declared column types; columns not listed here are inferred.
    pub declared: Vec<Field>,
    /// Statistics, grouping and label column.
    pub spec: AggregateSpec,
    /// Row filters; all must match for a row to be folded.
    pub filters: Vec<RowFilter>,
    /// Maximum number of diagnostics kept in the report (`None` keeps all).
    pub max_diagnostics: Option<usize>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn AggregationObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: AggregationSeverity,
}

impl fmt::Debug for AggregateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateOptions")
            .field("tokenizer", &self.tokenizer)
            .field("has_headers", &self.has_headers)
            .field("declared", &self.declared)
            .field("spec", &self.spec)
            .field("filters", &self.filters)
            .field("max_diagnostics", &self.max_diagnostics)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerOptions::default(),
            has_headers: true,
            declared: Vec::new(),
            spec: AggregateSpec::default(),
            filters: Vec::new(),
            max_diagnostics: Some(1_000),
            observer: None,
            alert_at_or_above: AggregationSeverity::Critical,
        }
    }
}

impl AggregateOptions {
    /// Declare the type of `column`, replacing an earlier declaration.
    pub fn declare(&mut self, column: impl Into<String>, data_type: DataType) -> &mut Self {
        let field = Field::new(column, data_type);
        self.declared.retain(|f| f.name != field.name);
        self.declared.push(field);
        self
    }

    pub(crate) fn declared_type(&self, column: &str) -> Option<DataType> {
        self.declared
            .iter()
            .find(|f| f.name == column)
            .and_then(|f| f.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::{AggregateOptions, RowFilter};
    use crate::types::DataType;

    #[test]
    fn row_filter_parses_column_equals_value() {
        assert_eq!(RowFilter::parse("app=maya"), Some(RowFilter::new("app", "maya")));
        assert_eq!(RowFilter::parse("note=a=b"), Some(RowFilter::new("note", "a=b")));
        assert_eq!(RowFilter::parse("flag="), Some(RowFilter::new("flag", "")));
        assert_eq!(RowFilter::parse("=x"), None);
        assert_eq!(RowFilter::parse("nothing"), None);
    }

    #[test]
    fn declare_replaces_previous_type() {
        let mut opts = AggregateOptions::default();
        opts.declare("a", DataType::Int64).declare("a", DataType::Utf8);
        assert_eq!(opts.declared.len(), 1);
        assert_eq!(opts.declared_type("a"), Some(DataType::Utf8));
        assert_eq!(opts.declared_type("b"), None);
    }
}
