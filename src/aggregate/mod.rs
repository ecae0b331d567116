//! Aggregation over typed rows.
//!
//! An [`Aggregator`] holds one [`AggregateState`] per column (plus one set per group key when
//! grouping). Rows are folded one at a time with [`Aggregator::fold`];
//! [`Aggregator::finalize`] consumes the aggregator and returns an immutable
//! [`AggregateSnapshot`].
//!
//! ## Example
//!
//! ```rust
//! use csv_aggregate::aggregate::{AggregateSpec, Aggregator};
//! use csv_aggregate::types::Value;
//!
//! let mut agg = Aggregator::new(vec!["a".into(), "b".into()], &AggregateSpec::default()).unwrap();
//! agg.fold(&[Value::Int64(1), Value::Int64(2)]);
//! agg.fold(&[Value::Int64(3), Value::Int64(4)]);
//!
//! let snapshot = agg.finalize();
//! let a = snapshot.column("a").unwrap();
//! assert_eq!(a.count, 2);
//! assert_eq!(a.sum, 4.0);
//! assert_eq!(a.min, Some(Value::Int64(1)));
//! assert_eq!(a.max, Some(Value::Int64(3)));
//! ```

mod snapshot;
mod state;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AggregateError, AggregateResult};
use crate::types::{Row, Value};

pub use snapshot::{AggregateSnapshot, ColumnAggregate, GroupAggregate};
pub use state::AggregateState;

/// Statistics that can be requested for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    /// Number of non-missing values.
    Count,
    /// Sum of numeric values.
    Sum,
    /// Arithmetic mean of numeric values.
    #[serde(alias = "avg", alias = "average")]
    Mean,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Occurrence count per distinct value.
    Distinct,
}

impl AggregateKind {
    /// Every kind, in report order.
    pub const ALL: [AggregateKind; 6] = [
        Self::Count,
        Self::Sum,
        Self::Mean,
        Self::Min,
        Self::Max,
        Self::Distinct,
    ];

    /// Parse a kind from its name (case-insensitive; `avg`/`average` mean [`Self::Mean`]).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "mean" | "avg" | "average" => Some(Self::Mean),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "distinct" => Some(Self::Distinct),
            _ => None,
        }
    }
}

/// What to aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    /// Requested statistics. Count/sum/min/max are always maintained; this list controls
    /// distinct-value tracking and what reporters print.
    pub aggregates: Vec<AggregateKind>,
    /// Column whose values partition the rows into groups.
    pub group_by: Option<String>,
    /// Column whose value identifies the row holding each column's min and max.
    pub label: Option<String>,
}

impl Default for AggregateSpec {
    fn default() -> Self {
        Self {
            aggregates: AggregateKind::ALL.to_vec(),
            group_by: None,
            label: None,
        }
    }
}

impl AggregateSpec {
    /// Whether `kind` was requested.
    pub fn wants(&self, kind: AggregateKind) -> bool {
        self.aggregates.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct GroupState {
    rows: u64,
    columns: Vec<AggregateState>,
}

/// Running aggregation over rows with a fixed column layout.
#[derive(Debug, Clone)]
pub struct Aggregator {
    columns: Vec<String>,
    spec: AggregateSpec,
    group_by: Option<usize>,
    label: Option<usize>,
    totals: Vec<AggregateState>,
    groups: BTreeMap<Value, GroupState>,
    rows_folded: u64,
}

impl Aggregator {
    /// Create an aggregator with identity state for every column.
    ///
    /// Fails with [`AggregateError::SchemaMismatch`] if the group-by or label column is not
    /// one of `columns`.
    pub fn new(columns: Vec<String>, spec: &AggregateSpec) -> AggregateResult<Self> {
        let resolve = |role: &str, name: &Option<String>| -> AggregateResult<Option<usize>> {
            match name {
                None => Ok(None),
                Some(name) => columns
                    .iter()
                    .position(|c| c == name)
                    .map(Some)
                    .ok_or_else(|| AggregateError::SchemaMismatch {
                        message: format!("unknown {role} column '{name}'. columns={columns:?}"),
                    }),
            }
        };
        let group_by = resolve("group-by", &spec.group_by)?;
        let label = resolve("label", &spec.label)?;

        let track_distinct = spec.wants(AggregateKind::Distinct);
        let totals = vec![AggregateState::new(track_distinct); columns.len()];

        Ok(Self {
            columns,
            spec: spec.clone(),
            group_by,
            label,
            totals,
            groups: BTreeMap::new(),
            rows_folded: 0,
        })
    }

    /// Column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// The [`AggregateSpec`] this aggregator was built with.
    pub fn spec(&self) -> &AggregateSpec {
        &self.spec
    }

    /// Number of rows folded so far.
    pub fn rows_folded(&self) -> u64 {
        self.rows_folded
    }

    /// Running state of a column, by name.
    pub fn state(&self, column: &str) -> Option<&AggregateState> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.totals.get(idx)
    }

    /// Fold one row into every column's state. Missing values are skipped per column.
    ///
    /// # Panics
    ///
    /// Panics if the row length does not match the number of columns.
    pub fn fold(&mut self, row: &[Value]) {
        assert!(
            row.len() == self.columns.len(),
            "row length {} does not match column count {}",
            row.len(),
            self.columns.len()
        );

        let label = self.label.map(|idx| &row[idx]);
        for (state, value) in self.totals.iter_mut().zip(row) {
            state.update(value, label);
        }

        if let Some(key_idx) = self.group_by {
            let track_distinct = self.spec.wants(AggregateKind::Distinct);
            let width = self.columns.len();
            let group = self
                .groups
                .entry(row[key_idx].clone())
                .or_insert_with(|| GroupState {
                    rows: 0,
                    columns: vec![AggregateState::new(track_distinct); width],
                });
            group.rows += 1;
            for (idx, (state, value)) in group.columns.iter_mut().zip(row).enumerate() {
                if idx != key_idx {
                    state.update(value, label);
                }
            }
        }

        self.rows_folded += 1;
    }

    /// Fold every row from `rows`.
    pub fn fold_rows<I, R>(&mut self, rows: I)
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Value]>,
    {
        for row in rows {
            self.fold(row.as_ref());
        }
    }

    /// Return every state to identity values.
    pub fn reset(&mut self) {
        for state in &mut self.totals {
            state.reset();
        }
        self.groups.clear();
        self.rows_folded = 0;
    }

    /// Combine `other` into `self`.
    ///
    /// Both aggregators must have the same columns, grouping and label, and every column's
    /// locked type must agree. The result equals folding both inputs' rows into one aggregator,
    /// regardless of merge order.
    pub fn merge(&mut self, other: Aggregator) -> AggregateResult<()> {
        if self.columns != other.columns
            || self.group_by != other.group_by
            || self.label != other.label
        {
            return Err(AggregateError::SchemaMismatch {
                message: format!(
                    "cannot merge aggregators over different layouts: {:?} vs {:?}",
                    self.columns, other.columns
                ),
            });
        }
        for ((name, mine), theirs) in self.columns.iter().zip(&self.totals).zip(&other.totals) {
            if !mine.is_compatible(theirs) {
                return Err(AggregateError::SchemaMismatch {
                    message: format!(
                        "column '{name}' has type {:?} in one input and {:?} in the other",
                        mine.data_type, theirs.data_type
                    ),
                });
            }
        }

        for (mine, theirs) in self.totals.iter_mut().zip(&other.totals) {
            mine.merge(theirs);
        }
        for (key, theirs) in other.groups {
            match self.groups.get_mut(&key) {
                Some(mine) => {
                    mine.rows += theirs.rows;
                    for (m, t) in mine.columns.iter_mut().zip(&theirs.columns) {
                        m.merge(t);
                    }
                }
                None => {
                    self.groups.insert(key, theirs);
                }
            }
        }
        self.rows_folded += other.rows_folded;
        Ok(())
    }

    /// Fold `rows` in chunks of `chunk_size`, each into its own aggregator, and merge the
    /// partial results in order.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size == 0`.
    pub fn fold_chunked(
        columns: Vec<String>,
        spec: &AggregateSpec,
        rows: &[Row],
        chunk_size: usize,
    ) -> AggregateResult<Self> {
        assert!(chunk_size > 0, "chunk_size must be > 0");
        let mut out = Self::new(columns.clone(), spec)?;
        for chunk in rows.chunks(chunk_size) {
            let mut part = Self::new(columns.clone(), spec)?;
            part.fold_rows(chunk);
            out.merge(part)?;
        }
        Ok(out)
    }

    /// Finish aggregation and return the read-only result.
    pub fn finalize(self) -> AggregateSnapshot {
        let columns = self
            .columns
            .iter()
            .cloned()
            .zip(self.totals)
            .map(|(name, state)| ColumnAggregate { name, state })
            .collect();

        let key_idx = self.group_by;
        let groups = self
            .groups
            .into_iter()
            .map(|(key, group)| GroupAggregate {
                key,
                rows: group.rows,
                columns: self
                    .columns
                    .iter()
                    .cloned()
                    .zip(group.columns)
                    .enumerate()
                    .filter(|(idx, _)| Some(*idx) != key_idx)
                    .map(|(_, (name, state))| ColumnAggregate { name, state })
                    .collect(),
            })
            .collect();

        AggregateSnapshot {
            aggregates: self.spec.aggregates,
            group_by: self.spec.group_by,
            label: self.spec.label,
            rows_folded: self.rows_folded,
            columns,
            groups,
        }
    }
}
