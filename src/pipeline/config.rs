//! JSON run configuration.
//!
//! Every key is optional; present keys override the corresponding [`AggregateOptions`] field.
//!
//! ```json
//! {
//!   "delimiter": ";",
//!   "has_headers": true,
//!   "aggregates": ["count", "mean", "max"],
//!   "group_by": "renderer",
//!   "label": "uid",
//!   "types": { "peak_ram": "float" },
//!   "filters": [{ "column": "success", "equals": "true" }]
//! }
//! ```

#![warn(missing_docs)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::aggregate::AggregateKind;
use crate::error::AggregateResult;
use crate::types::DataType;

use super::options::{AggregateOptions, RowFilter};

/// Deserialized configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregateConfig {
    /// Field separator.
    pub delimiter: Option<char>,
    /// Quote character.
    pub quote: Option<char>,
    /// Trim whitespace around fields.
    pub trim: Option<bool>,
    /// Whether the first non-empty line names the columns.
    pub has_headers: Option<bool>,
    /// Statistics to report. Replaces the default set rather than extending it.
    pub aggregates: Option<Vec<AggregateKind>>,
    /// Column whose value keys the groups.
    pub group_by: Option<String>,
    /// Column whose value is reported next to each min and max.
    pub label: Option<String>,
    /// Declared types by column name; merged into existing declarations.
    pub types: BTreeMap<String, DataType>,
    /// Appended to any filters already set.
    pub filters: Vec<RowFilter>,
    /// Cap on kept diagnostics.
    pub max_diagnostics: Option<usize>,
}

impl AggregateConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(s: &str) -> AggregateResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> AggregateResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Override `options` with every key present in this configuration.
    pub fn apply(self, options: &mut AggregateOptions) {
        if let Some(d) = self.delimiter {
            options.tokenizer.delimiter = d;
        }
        if let Some(q) = self.quote {
            options.tokenizer.quote = q;
        }
        if let Some(t) = self.trim {
            options.tokenizer.trim = t;
        }
        if let Some(h) = self.has_headers {
            options.has_headers = h;
        }
        if let Some(aggregates) = self.aggregates {
            options.spec.aggregates = aggregates;
        }
        if self.group_by.is_some() {
            options.spec.group_by = self.group_by;
        }
        if self.label.is_some() {
            options.spec.label = self.label;
        }
        for (column, data_type) in self.types {
            options.declare(column, data_type);
        }
        options.filters.extend(self.filters);
        if self.max_diagnostics.is_some() {
            options.max_diagnostics = self.max_diagnostics;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AggregateConfig;
    use crate::aggregate::AggregateKind;
    use crate::pipeline::{AggregateOptions, RowFilter};
    use crate::types::DataType;

    #[test]
    fn applies_present_keys_only() {
        let cfg = AggregateConfig::from_json_str(
            r#"{
                "delimiter": "\t",
                "aggregates": ["count", "avg", "max"],
                "group_by": "renderer",
                "types": { "peak_ram": "float", "frames": "int" },
                "filters": [{ "column": "success", "equals": "true" }]
            }"#,
        )
        .unwrap();

        let mut opts = AggregateOptions::default();
        cfg.apply(&mut opts);

        assert_eq!(opts.tokenizer.delimiter, '\t');
        assert_eq!(opts.tokenizer.quote, '"');
        assert!(opts.has_headers);
        assert_eq!(
            opts.spec.aggregates,
            vec![AggregateKind::Count, AggregateKind::Mean, AggregateKind::Max]
        );
        assert_eq!(opts.spec.group_by.as_deref(), Some("renderer"));
        assert_eq!(opts.declared_type("peak_ram"), Some(DataType::Float64));
        assert_eq!(opts.declared_type("frames"), Some(DataType::Int64));
        assert_eq!(opts.filters, vec![RowFilter::new("success", "true")]);
    }

    #[test]
    fn every_documented_key_reaches_the_options() {
        let cfg = AggregateConfig::from_json_str(
            r#"{
                "quote": "'",
                "trim": true,
                "has_headers": false,
                "label": "uid",
                "types": { "a": "string" },
                "filters": [{ "column": "app", "equals": "maya" }],
                "max_diagnostics": 5
            }"#,
        )
        .unwrap();

        let mut opts = AggregateOptions::default();
        opts.declare("a", DataType::Int64).declare("b", DataType::Int64);
        opts.filters.push(RowFilter::new("success", "true"));
        cfg.apply(&mut opts);

        assert_eq!(opts.tokenizer.quote, '\'');
        assert!(opts.tokenizer.trim);
        assert!(!opts.has_headers);
        assert_eq!(opts.spec.label.as_deref(), Some("uid"));
        assert_eq!(opts.declared_type("a"), Some(DataType::Utf8));
        assert_eq!(opts.declared_type("b"), Some(DataType::Int64));
        assert_eq!(
            opts.filters,
            vec![RowFilter::new("success", "true"), RowFilter::new("app", "maya")]
        );
        assert_eq!(opts.max_diagnostics, Some(5));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = AggregateConfig::from_json_str(r#"{ "delimeter": ";" }"#).unwrap_err();
        assert!(err.to_string().contains("json error"));
    }
}
