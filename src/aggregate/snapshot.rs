//! Finalized, read-only aggregation results.

use serde::Serialize;

use super::{AggregateKind, AggregateState};
use crate::types::Value;

/// Finalized state of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAggregate {
    /// Column name.
    pub name: String,
    /// Final state.
    #[serde(flatten)]
    pub state: AggregateState,
}

/// Finalized states for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    /// Value of the group-by column shared by the rows of this group.
    pub key: Value,
    /// Number of rows in the group.
    pub rows: u64,
    /// Per-column states, excluding the group-by column itself.
    pub columns: Vec<ColumnAggregate>,
}

impl GroupAggregate {
    /// Look up a column's state within this group.
    pub fn column(&self, name: &str) -> Option<&AggregateState> {
        find(&self.columns, name)
    }
}

/// Immutable result of [`super::Aggregator::finalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    /// Statistics requested for reporting.
    pub aggregates: Vec<AggregateKind>,
    /// Group-by column, if any.
    pub group_by: Option<String>,
    /// Label column, if any.
    pub label: Option<String>,
    /// Number of rows folded.
    pub rows_folded: u64,
    /// Overall per-column states, in column order.
    pub columns: Vec<ColumnAggregate>,
    /// Per-group states ordered by key; empty without a group-by column.
    pub groups: Vec<GroupAggregate>,
}

impl AggregateSnapshot {
    /// Look up a column's overall state.
    pub fn column(&self, name: &str) -> Option<&AggregateState> {
        find(&self.columns, name)
    }

    /// Look up a group by key.
    pub fn group(&self, key: &Value) -> Option<&GroupAggregate> {
        self.groups
            .binary_search_by(|g| g.key.cmp(key))
            .ok()
            .map(|idx| &self.groups[idx])
    }

    /// Whether no rows were folded.
    pub fn is_empty(&self) -> bool {
        self.rows_folded == 0
    }

    /// Whether `kind` was requested.
    pub fn wants(&self, kind: AggregateKind) -> bool {
        self.aggregates.contains(&kind)
    }
}

fn find<'a>(columns: &'a [ColumnAggregate], name: &str) -> Option<&'a AggregateState> {
    columns.iter().find(|c| c.name == name).map(|c| &c.state)
}
