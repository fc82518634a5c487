use super::column::{DataType, SourceType};
use itertools::Itertools;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A single typed value held by a condition cell or a result field.
///
/// On the wire `null` reads as the empty value, and whole numbers are written without a
/// fractional part.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// The empty-string value the model uses instead of `null`.
    pub fn empty() -> Self {
        Scalar::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.trim().is_empty())
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::empty()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => match whole(*n) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", n),
            },
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

fn whole(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => match whole(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(b) => Ok(Scalar::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Scalar::Number)
                .ok_or_else(|| D::Error::custom(format!("number out of range: {}", n))),
            serde_json::Value::String(s) => Ok(Scalar::Text(s)),
            serde_json::Value::Null => Ok(Scalar::empty()),
            other => Err(D::Error::custom(format!("expected a scalar, found {}", other))),
        }
    }
}

/// The committed value of a condition leaf. Its shape follows the leaf's operator:
/// a scalar for equality-like operators, a two-element list for `between`, and an
/// arbitrary list for `in`/`not in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    List(Vec<Scalar>),
    Scalar(Scalar),
}

impl CellValue {
    pub fn empty() -> Self {
        CellValue::Scalar(Scalar::empty())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Scalar(s) => s.is_empty(),
            CellValue::List(items) => items.iter().all(Scalar::is_empty),
        }
    }

    /// The raw display form: lists are comma-joined.
    pub fn to_display(&self) -> String {
        match self {
            CellValue::Scalar(s) => s.to_string(),
            CellValue::List(items) => items.iter().join(","),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::empty()
    }
}

impl From<Scalar> for CellValue {
    fn from(value: Scalar) -> Self {
        CellValue::Scalar(value)
    }
}

/// A result field bound to another attribute instead of holding a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeReference {
    #[serde(
        rename = "sourceType",
        alias = "source_type",
        default,
        deserialize_with = "lenient_tag"
    )]
    pub source_type: Option<SourceType>,
    #[serde(rename = "value")]
    pub attribute_name: String,
    #[serde(rename = "isAttributeData")]
    marker: Marker,
    #[serde(
        rename = "dataType",
        alias = "data_type",
        default,
        deserialize_with = "lenient_tag"
    )]
    pub data_type: Option<DataType>,
}

impl AttributeReference {
    pub fn new(
        attribute_name: impl Into<String>,
        source_type: Option<SourceType>,
        data_type: Option<DataType>,
    ) -> Self {
        Self {
            source_type,
            attribute_name: attribute_name.into(),
            marker: Marker,
            data_type,
        }
    }
}

/// The value stored under one key of a row's result map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultValue {
    Attribute(AttributeReference),
    Literal(Scalar),
}

impl ResultValue {
    pub fn empty() -> Self {
        ResultValue::Literal(Scalar::empty())
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, ResultValue::Attribute(_))
    }
}

impl Default for ResultValue {
    fn default() -> Self {
        ResultValue::empty()
    }
}

/// A boolean field that is always `true` on the wire (`isGroup`, `isAttributeData`).
/// Deserializing `false` fails, which lets untagged enums use it as a discriminant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Marker;

impl Serialize for Marker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(true)
    }
}

impl<'de> Deserialize<'de> for Marker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? {
            Ok(Marker)
        } else {
            Err(D::Error::custom("marker flag must be true"))
        }
    }
}

/// Reads an optional tag where the backend may send `""` or `null` for "not chosen yet".
pub(crate) fn lenient_tag<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw.parse().map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

/// Reads `null` as the field's default, for fields the backend may send as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row ids arrive as either strings or epoch-millisecond numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("unexpected row id: {}", other))),
    }
}
