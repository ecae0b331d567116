//! Core data model types.
//!
//! Raw fields are coerced into typed [`Value`]s matching a column's [`DataType`]. A [`Schema`]
//! lists the columns of an input, each either declared up front or left to inference.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize, Serializer};

/// Logical data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 64-bit signed integer.
    #[serde(alias = "int", alias = "integer")]
    Int64,
    /// 64-bit floating point number.
    #[serde(alias = "float", alias = "double")]
    Float64,
    /// UTF-8 string.
    #[serde(alias = "string", alias = "str")]
    Utf8,
}

impl DataType {
    /// Parse a user-facing type name (`int`, `float`, `string`, ...), case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "int64" | "i64" => Some(Self::Int64),
            "float" | "double" | "float64" | "f64" => Some(Self::Float64),
            "string" | "str" | "text" | "utf8" => Some(Self::Utf8),
            _ => None,
        }
    }

    /// Whether values of this type contribute to sums and means.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int64 => "integer",
            Self::Float64 => "float",
            Self::Utf8 => "string",
        })
    }
}

/// A single named column in a [`Schema`].
///
/// `data_type` is `Some` when the type was declared up front and `None` when it is inferred from
/// the first non-missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Declared column type, if any.
    pub data_type: Option<DataType>,
}

impl Field {
    /// Create a field with a declared type.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
        }
    }

    /// Create a field whose type is inferred from the data.
    pub fn inferred(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }
}

/// Ordered list of columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Schema with every column inferred, named after `names`.
    pub fn inferred<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Field::inferred).collect())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value.
///
/// Values carry a total order so they can key ordered maps: variants order as
/// `Null < Int64 < Float64 < Utf8`, and floats compare with [`f64::total_cmp`]. Columns are
/// locked to one type, so cross-variant comparisons never decide a min or max.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Whether this value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The data type of this value, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Int64(_) => Some(DataType::Int64),
            Self::Float64(_) => Some(DataType::Float64),
            Self::Utf8(_) => Some(DataType::Utf8),
        }
    }

    /// Numeric view of this value for sum/mean accumulation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) => Some(*v),
            Self::Null | Self::Utf8(_) => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int64(_) => 1,
            Self::Float64(_) => 2,
            Self::Utf8(_) => 3,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            (Self::Utf8(a), Self::Utf8(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Null => {}
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.to_bits().hash(state),
            Self::Utf8(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Int64(v) => serializer.serialize_i64(*v),
            Self::Float64(v) => serializer.serialize_f64(*v),
            Self::Utf8(s) => serializer.serialize_str(s),
        }
    }
}

/// One typed row, in schema order.
pub type Row = Vec<Value>;

#[cfg(test)]
mod tests {
    use super::{DataType, Field, Schema, Value};

    #[test]
    fn schema_index_of_works() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::inferred("name"),
        ]);
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn type_names_parse_case_insensitively() {
        assert_eq!(DataType::from_name("INT"), Some(DataType::Int64));
        assert_eq!(DataType::from_name("float"), Some(DataType::Float64));
        assert_eq!(DataType::from_name("String"), Some(DataType::Utf8));
        assert_eq!(DataType::from_name("bool"), None);
    }

    #[test]
    fn values_order_within_and_across_variants() {
        assert!(Value::Int64(1) < Value::Int64(2));
        assert!(Value::Float64(-0.5) < Value::Float64(0.25));
        assert!(Value::Utf8("a".into()) < Value::Utf8("b".into()));
        assert!(Value::Null < Value::Int64(i64::MIN));
        assert!(Value::Float64(f64::MAX) < Value::Utf8(String::new()));
    }

    #[test]
    fn float_values_are_usable_as_keys() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Value::Float64(1.5));
        set.insert(Value::Float64(1.5));
        set.insert(Value::Float64(f64::NAN));
        set.insert(Value::Float64(f64::NAN));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn as_f64_widens_integers() {
        assert_eq!(Value::Int64(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float64(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::Utf8("3".into()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }
}
