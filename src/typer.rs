//! Row typer: coerces raw fields into typed [`Value`]s.
//!
//! Each column is either declared (fixed type from the [`Schema`]) or inferred. An inferred
//! column locks its type on the first non-missing value it sees. After that:
//!
//! - `Float64` columns accept integer literals (widened to float)
//! - `Int64` columns reject float literals and text with [`RowError::TypeMismatch`]
//! - `Utf8` columns accept any non-missing field verbatim
//!
//! A mismatching value is replaced by [`Value::Null`] so the rest of the row still folds.

use crate::error::RowError;
use crate::types::{DataType, Row, Schema, Value};

/// Output of [`RowTyper::type_row`].
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRow {
    /// One value per column; mismatching fields are [`Value::Null`].
    pub values: Row,
    /// Per-column coercion failures for this row.
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone)]
struct ColumnType {
    name: String,
    locked: Option<DataType>,
}

/// Stateful per-column coercion with type locking.
#[derive(Debug, Clone)]
pub struct RowTyper {
    columns: Vec<ColumnType>,
}

impl RowTyper {
    /// Create a typer for `schema`; declared types are locked from the start.
    pub fn new(schema: &Schema) -> Self {
        let columns = schema
            .fields
            .iter()
            .map(|f| ColumnType {
                name: f.name.clone(),
                locked: f.data_type,
            })
            .collect();
        Self { columns }
    }

    /// Number of columns this typer expects.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Current type of each column (`None` while still undecided).
    pub fn column_types(&self) -> Vec<Option<DataType>> {
        self.columns.iter().map(|c| c.locked).collect()
    }

    /// Coerce one row of fields. `fields.len()` must equal [`Self::width`]; extra fields are
    /// ignored and missing ones read as empty.
    pub fn type_row<S: AsRef<str>>(&mut self, fields: &[S]) -> TypedRow {
        let mut values = Vec::with_capacity(self.columns.len());
        let mut errors = Vec::new();

        for (idx, column) in self.columns.iter_mut().enumerate() {
            let raw = fields.get(idx).map(AsRef::as_ref).unwrap_or("");
            let value = match column.locked {
                None => {
                    let v = infer_value(raw);
                    column.locked = v.data_type();
                    v
                }
                Some(dt) => match coerce(raw, dt) {
                    Some(v) => v,
                    None => {
                        errors.push(RowError::TypeMismatch {
                            column: column.name.clone(),
                            expected: dt,
                            raw: raw.to_owned(),
                        });
                        Value::Null
                    }
                },
            };
            values.push(value);
        }

        TypedRow { values, errors }
    }
}

/// Classify a raw field without a target type.
pub fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else if is_integer_literal(trimmed) {
        trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .or_else(|_| trimmed.parse::<f64>().map(Value::Float64))
            .unwrap_or_else(|_| Value::Utf8(raw.to_owned()))
    } else if is_float_literal(trimmed) {
        trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .unwrap_or_else(|_| Value::Utf8(raw.to_owned()))
    } else {
        Value::Utf8(raw.to_owned())
    }
}

/// Coerce a raw field into `data_type`. Returns `None` when the field does not fit.
pub fn coerce(raw: &str, data_type: DataType) -> Option<Value> {
    if raw.trim().is_empty() {
        return Some(Value::Null);
    }
    match (data_type, infer_value(raw)) {
        (DataType::Utf8, _) => Some(Value::Utf8(raw.to_owned())),
        (DataType::Int64, v @ Value::Int64(_)) => Some(v),
        (DataType::Float64, Value::Int64(v)) => Some(Value::Float64(v as f64)),
        (DataType::Float64, v @ Value::Float64(_)) => Some(v),
        _ => None,
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

// Digits with optional sign, decimal point and exponent. Rejects `inf`/`nan` spellings that
// `f64::from_str` would otherwise accept.
fn is_float_literal(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
}

#[cfg(test)]
mod tests {
    use super::{RowTyper, coerce, infer_value};
    use crate::error::RowError;
    use crate::types::{DataType, Field, Schema, Value};

    #[test]
    fn infers_closed_set_of_types() {
        assert_eq!(infer_value(""), Value::Null);
        assert_eq!(infer_value("   "), Value::Null);
        assert_eq!(infer_value("42"), Value::Int64(42));
        assert_eq!(infer_value(" -7 "), Value::Int64(-7));
        assert_eq!(infer_value("2.5"), Value::Float64(2.5));
        assert_eq!(infer_value("1e3"), Value::Float64(1000.0));
        assert_eq!(infer_value("abc"), Value::Utf8("abc".to_string()));
        assert_eq!(infer_value("1.2.3"), Value::Utf8("1.2.3".to_string()));
    }

    #[test]
    fn inf_and_nan_spellings_are_text() {
        assert_eq!(infer_value("inf"), Value::Utf8("inf".to_string()));
        assert_eq!(infer_value("NaN"), Value::Utf8("NaN".to_string()));
    }

    #[test]
    fn oversized_integer_becomes_float() {
        assert_eq!(
            infer_value("99999999999999999999"),
            Value::Float64(99999999999999999999.0)
        );
    }

    #[test]
    fn text_keeps_surrounding_whitespace() {
        assert_eq!(infer_value(" x "), Value::Utf8(" x ".to_string()));
        assert_eq!(coerce(" 5", DataType::Utf8), Some(Value::Utf8(" 5".to_string())));
    }

    #[test]
    fn coerce_widens_int_to_float_but_not_back() {
        assert_eq!(coerce("3", DataType::Float64), Some(Value::Float64(3.0)));
        assert_eq!(coerce("3.5", DataType::Int64), None);
        assert_eq!(coerce("x", DataType::Float64), None);
        assert_eq!(coerce("", DataType::Int64), Some(Value::Null));
    }

    #[test]
    fn inference_locks_on_first_non_missing_value() {
        let mut typer = RowTyper::new(&Schema::inferred(["a"]));
        assert_eq!(typer.type_row(&[""]).values, vec![Value::Null]);
        assert_eq!(typer.column_types(), vec![None]);

        assert_eq!(typer.type_row(&["1"]).values, vec![Value::Int64(1)]);
        assert_eq!(typer.column_types(), vec![Some(DataType::Int64)]);

        let row = typer.type_row(&["1.5"]);
        assert_eq!(row.values, vec![Value::Null]);
        assert_eq!(
            row.errors,
            vec![RowError::TypeMismatch {
                column: "a".to_string(),
                expected: DataType::Int64,
                raw: "1.5".to_string(),
            }]
        );
    }

    #[test]
    fn string_lock_accepts_numbers_verbatim() {
        let mut typer = RowTyper::new(&Schema::inferred(["b"]));
        typer.type_row(&["x"]);
        let row = typer.type_row(&["3"]);
        assert!(row.errors.is_empty());
        assert_eq!(row.values, vec![Value::Utf8("3".to_string())]);
    }

    #[test]
    fn declared_numeric_column_reports_mismatch_and_keeps_other_columns() {
        let schema = Schema::new(vec![
            Field::new("n", DataType::Float64),
            Field::inferred("s"),
        ]);
        let mut typer = RowTyper::new(&schema);
        let row = typer.type_row(&["oops", "hello"]);
        assert_eq!(
            row.values,
            vec![Value::Null, Value::Utf8("hello".to_string())]
        );
        assert_eq!(row.errors.len(), 1);
    }
}
