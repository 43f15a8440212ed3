//! Attribute values and metadata dictionaries
//!
//! Attributes are modelled as a tagged value: scalars take part in equality
//! comparisons, embedded arrays do not.

use netcdf::AttributeValue;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute name to value mapping, ordered so that reports are deterministic
pub type MetadataDict = BTreeMap<String, AttrValue>;

/// A scalar attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the scalar, if it is a number
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(v) => Some(*v),
            Scalar::Text(_) => None,
        }
    }

    /// Equality used by the metadata checks: numbers compare by value across
    /// integer and float representations, text compares exactly.
    #[must_use]
    pub fn matches(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A metadata value: a comparable scalar or an embedded array
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Scalar(Scalar),
    /// Array-valued attribute, always treated as matching
    Array(Vec<f64>),
}

impl AttrValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Scalar(Scalar::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Scalar(s) => s.as_f64(),
            AttrValue::Array(_) => None,
        }
    }

    /// Comparison for metadata checks: arrays are exempt and always match
    #[must_use]
    pub fn matches(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Scalar(a), AttrValue::Scalar(b)) => a.matches(b),
            _ => true,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            AttrValue::Scalar(Scalar::Int(i)) => json!(i),
            AttrValue::Scalar(Scalar::Float(v)) => json!(v),
            AttrValue::Scalar(Scalar::Text(s)) => json!(s),
            AttrValue::Array(values) => json!(values),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Scalar(s) => write!(f, "{}", s),
            AttrValue::Array(values) => write!(f, "{:?}", values),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Scalar(Scalar::Text(value.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Scalar(Scalar::Text(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Scalar(Scalar::Float(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Scalar(Scalar::Int(i64::from(value)))
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(values: Vec<f64>) -> Self {
        AttrValue::Array(values)
    }
}

fn widen<T: Copy + Into<f64>>(values: &[T]) -> AttrValue {
    AttrValue::Array(values.iter().map(|&v| v.into()).collect())
}

impl From<AttributeValue> for AttrValue {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Str(s) => AttrValue::from(s),
            // String lists carry no single comparable value
            AttributeValue::Strs(_) => AttrValue::Array(Vec::new()),
            AttributeValue::Float(v) => AttrValue::from(f64::from(v)),
            AttributeValue::Double(v) => AttrValue::from(v),
            AttributeValue::Int(v) => AttrValue::from(v),
            AttributeValue::Short(v) => AttrValue::from(i64::from(v)),
            AttributeValue::Uchar(v) => AttrValue::from(i64::from(v)),
            AttributeValue::Ushort(v) => AttrValue::from(i64::from(v)),
            AttributeValue::Uint(v) => AttrValue::from(i64::from(v)),
            AttributeValue::Schar(v) => AttrValue::from(i64::from(v)),
            AttributeValue::Longlong(v) => AttrValue::from(v),
            AttributeValue::Ulonglong(v) => match i64::try_from(v) {
                Ok(i) => AttrValue::from(i),
                Err(_) => AttrValue::from(v as f64),
            },
            AttributeValue::Floats(vs) => widen(&vs),
            AttributeValue::Doubles(vs) => AttrValue::Array(vs),
            AttributeValue::Ints(vs) => widen(&vs),
            AttributeValue::Shorts(vs) => widen(&vs),
            AttributeValue::Uchars(vs) => widen(&vs),
            AttributeValue::Ushorts(vs) => widen(&vs),
            AttributeValue::Uints(vs) => widen(&vs),
            AttributeValue::Schars(vs) => widen(&vs),
            AttributeValue::Longlongs(vs) => AttrValue::Array(vs.iter().map(|&v| v as f64).collect()),
            AttributeValue::Ulonglongs(vs) => AttrValue::Array(vs.iter().map(|&v| v as f64).collect()),
        }
    }
}

/// JSON object for a whole dictionary
pub fn dict_to_json(dict: &MetadataDict) -> JsonValue {
    JsonValue::Object(
        dict.iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}
