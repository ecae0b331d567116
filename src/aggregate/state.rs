//! Per-column running aggregate state.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::types::{DataType, Value};

/// Running statistics for one column.
///
/// `min`/`max` are `None` until the first non-missing value arrives; `None` plays the role of
/// the +∞/−∞ identity. `sum` accumulates in `f64` for both integer and float columns and stays
/// `0.0` for string columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateState {
    /// Type of the values folded so far (`None` while nothing was folded).
    pub data_type: Option<DataType>,
    /// Number of non-missing values.
    pub count: u64,
    /// Sum of numeric values.
    pub sum: f64,
    /// Smallest value seen.
    pub min: Option<Value>,
    /// Largest value seen.
    pub max: Option<Value>,
    /// Label of the row holding `min`, when a label column is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_label: Option<Value>,
    /// Label of the row holding `max`, when a label column is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_label: Option<Value>,
    /// Occurrences of each distinct value (empty unless distinct tracking is on).
    #[serde(serialize_with = "serialize_distinct")]
    pub distinct: BTreeMap<Value, u64>,
    #[serde(skip)]
    track_distinct: bool,
}

impl AggregateState {
    /// Identity state.
    pub fn new(track_distinct: bool) -> Self {
        Self {
            data_type: None,
            count: 0,
            sum: 0.0,
            min: None,
            max: None,
            min_label: None,
            max_label: None,
            distinct: BTreeMap::new(),
            track_distinct,
        }
    }

    /// Whether nothing has been folded into this state.
    pub fn is_identity(&self) -> bool {
        self.count == 0
    }

    /// Whether distinct values are being counted.
    pub fn tracks_distinct(&self) -> bool {
        self.track_distinct
    }

    /// Arithmetic mean of the folded values, for numeric columns with at least one value.
    pub fn mean(&self) -> Option<f64> {
        match self.data_type {
            Some(dt) if dt.is_numeric() && self.count > 0 => Some(self.sum / self.count as f64),
            _ => None,
        }
    }

    /// Number of distinct values seen.
    pub fn distinct_count(&self) -> usize {
        self.distinct.len()
    }

    /// Fold one value. Missing values are ignored.
    ///
    /// `label` identifies the row the value came from; on equal values the smaller label is
    /// kept so the result does not depend on fold order.
    pub fn update(&mut self, value: &Value, label: Option<&Value>) {
        if value.is_null() {
            return;
        }
        debug_assert!(
            self.data_type.is_none() || self.data_type == value.data_type(),
            "column type is locked"
        );
        self.data_type = self.data_type.or(value.data_type());
        self.count += 1;
        if let Some(x) = value.as_f64() {
            self.sum += x;
        }

        if replaces(value, label, self.min.as_ref(), self.min_label.as_ref(), Ordering::Less) {
            self.min = Some(value.clone());
            self.min_label = label.cloned();
        }
        if replaces(value, label, self.max.as_ref(), self.max_label.as_ref(), Ordering::Greater) {
            self.max = Some(value.clone());
            self.max_label = label.cloned();
        }

        if self.track_distinct {
            *self.distinct.entry(value.clone()).or_insert(0) += 1;
        }
    }

    /// Whether `other` can be merged into `self` (same type, or either still empty).
    pub fn is_compatible(&self, other: &AggregateState) -> bool {
        match (self.data_type, other.data_type) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Combine `other` into `self`: counts and sums add, min of mins, max of maxes, union of
    /// distinct counts. Associative and commutative (sums up to floating-point rounding).
    ///
    /// Callers check [`Self::is_compatible`] first.
    pub fn merge(&mut self, other: &AggregateState) {
        self.data_type = self.data_type.or(other.data_type);
        self.count += other.count;
        self.sum += other.sum;

        if let Some(v) = other.min.as_ref() {
            if replaces(v, other.min_label.as_ref(), self.min.as_ref(), self.min_label.as_ref(), Ordering::Less) {
                self.min = Some(v.clone());
                self.min_label = other.min_label.clone();
            }
        }
        if let Some(v) = other.max.as_ref() {
            if replaces(v, other.max_label.as_ref(), self.max.as_ref(), self.max_label.as_ref(), Ordering::Greater) {
                self.max = Some(v.clone());
                self.max_label = other.max_label.clone();
            }
        }

        for (value, n) in &other.distinct {
            *self.distinct.entry(value.clone()).or_insert(0) += n;
        }
    }

    /// Return to identity values, keeping the distinct-tracking setting.
    pub fn reset(&mut self) {
        *self = Self::new(self.track_distinct);
    }
}

// Whether `candidate` should replace `current` as the extreme in direction `want`.
// Equal values fall back to the smaller label.
fn replaces(
    candidate: &Value,
    candidate_label: Option<&Value>,
    current: Option<&Value>,
    current_label: Option<&Value>,
    want: Ordering,
) -> bool {
    let Some(current) = current else {
        return true;
    };
    match candidate.cmp(current) {
        Ordering::Equal => candidate_label < current_label,
        ord => ord == want,
    }
}

#[derive(Serialize)]
struct DistinctEntry<'a> {
    value: &'a Value,
    count: u64,
}

fn serialize_distinct<S: Serializer>(
    distinct: &BTreeMap<Value, u64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(distinct.len()))?;
    for (value, &count) in distinct {
        seq.serialize_element(&DistinctEntry { value, count })?;
    }
    seq.end()
}
