//! Conversion from raw display input to the typed values stored in the grid.
//!
//! Raw input is whatever the editor holds while the user types: a plain string, a
//! `{min, max}` pair, or a list of strings. Conversion never produces `null`; empty input
//! becomes `""`, and text that does not parse for its data type is kept as typed so the
//! caller can still show it and flag it.
use crate::model::{
    AttributeReference, CellValue, DataType, Operator, ResultValue, Scalar, ValueShape,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A raw, not yet converted, editor value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
    #[default]
    Null,
    Text(String),
    List(Vec<String>),
    Range { min: String, max: String },
}

impl RawInput {
    pub fn text(value: impl Into<String>) -> Self {
        RawInput::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawInput::Null => true,
            RawInput::Text(s) => s.is_empty(),
            RawInput::List(_) | RawInput::Range { .. } => false,
        }
    }

    /// The comma-joined string form kept in the pending input cache.
    pub fn to_display(&self) -> String {
        match self {
            RawInput::Null => String::new(),
            RawInput::Text(s) => s.clone(),
            RawInput::List(items) => items.iter().join(","),
            RawInput::Range { min, max } => format!("{},{}", min, max),
        }
    }
}

impl From<&str> for RawInput {
    fn from(value: &str) -> Self {
        RawInput::Text(value.to_string())
    }
}

impl From<String> for RawInput {
    fn from(value: String) -> Self {
        RawInput::Text(value)
    }
}

/// Input for a result cell: either raw text to convert or an attribute binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultInput {
    Attribute(AttributeReference),
    Raw(RawInput),
}

impl From<&str> for ResultInput {
    fn from(value: &str) -> Self {
        ResultInput::Raw(RawInput::from(value))
    }
}

/// Converts one raw string according to `data_type`.
pub fn convert_scalar(raw: &str, data_type: Option<DataType>) -> Scalar {
    if raw.is_empty() {
        return Scalar::empty();
    }
    match data_type {
        Some(DataType::Numeric) => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Scalar::Number(n),
            _ => Scalar::Text(raw.to_string()),
        },
        Some(DataType::Boolean) => match raw.trim() {
            "true" => Scalar::Bool(true),
            "false" => Scalar::Bool(false),
            _ => Scalar::Bool(true),
        },
        Some(DataType::Date | DataType::DateTime | DataType::String) | None => {
            Scalar::Text(raw.to_string())
        }
    }
}

/// Converts a raw condition value for a cell with the given data type and operator.
pub fn convert(raw: &RawInput, data_type: Option<DataType>, operator: &Operator) -> CellValue {
    if raw.is_empty() {
        return CellValue::empty();
    }
    match operator.shape() {
        ValueShape::Scalar => match raw {
            RawInput::Text(s) => CellValue::Scalar(convert_scalar(s, data_type)),
            other => CellValue::Scalar(Scalar::Text(other.to_display())),
        },
        ValueShape::Range => convert_range(raw, data_type),
        ValueShape::List => convert_list(raw, data_type),
    }
}

fn slot(raw: &str, data_type: Option<DataType>) -> Scalar {
    convert_scalar(raw.trim(), data_type)
}

fn convert_range(raw: &RawInput, data_type: Option<DataType>) -> CellValue {
    let parts: Vec<&str> = match raw {
        RawInput::Text(s) => s.split(',').collect(),
        RawInput::List(items) => items.iter().map(String::as_str).collect(),
        RawInput::Range { min, max } => vec![min.as_str(), max.as_str()],
        RawInput::Null => return CellValue::empty(),
    };
    if parts.len() < 2 {
        // Still typing the first bound: keep what was entered.
        return CellValue::Scalar(Scalar::Text(raw.to_display()));
    }
    CellValue::List(vec![slot(parts[0], data_type), slot(parts[1], data_type)])
}

fn convert_list(raw: &RawInput, data_type: Option<DataType>) -> CellValue {
    let items = match raw {
        RawInput::Text(s) => s.split(',').map(|p| slot(p, data_type)).collect(),
        RawInput::List(items) => items.iter().map(|p| slot(p, data_type)).collect(),
        RawInput::Range { min, max } => vec![slot(min, data_type), slot(max, data_type)],
        RawInput::Null => return CellValue::empty(),
    };
    CellValue::List(items)
}

/// Converts input for a result field. Attribute bindings are stored verbatim.
pub fn convert_result(input: &ResultInput, data_type: Option<DataType>) -> ResultValue {
    match input {
        ResultInput::Attribute(reference) => ResultValue::Attribute(reference.clone()),
        ResultInput::Raw(RawInput::Text(s)) => ResultValue::Literal(convert_scalar(s, data_type)),
        ResultInput::Raw(RawInput::Null) => ResultValue::empty(),
        ResultInput::Raw(other) => ResultValue::Literal(Scalar::Text(other.to_display())),
    }
}

/// Re-interprets a stored literal under a new data type, going through its display form.
pub fn reconvert_literal(value: &ResultValue, data_type: Option<DataType>) -> ResultValue {
    match value {
        ResultValue::Literal(scalar) => {
            ResultValue::Literal(convert_scalar(&scalar.to_string(), data_type))
        }
        bound => bound.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(key: &str) -> Operator {
        Operator::new(key)
    }

    #[test]
    fn numeric_keeps_unparseable_text() {
        assert_eq!(
            convert_scalar("abc", Some(DataType::Numeric)),
            Scalar::Text("abc".to_string())
        );
        assert_eq!(convert_scalar("", Some(DataType::Numeric)), Scalar::empty());
        assert_eq!(
            convert_scalar(" 12.5 ", Some(DataType::Numeric)),
            Scalar::Number(12.5)
        );
        assert_eq!(
            convert_scalar("NaN", Some(DataType::Numeric)),
            Scalar::Text("NaN".to_string())
        );
    }

    #[test]
    fn boolean_uses_truthiness_for_other_text() {
        assert_eq!(convert_scalar("true", Some(DataType::Boolean)), Scalar::Bool(true));
        assert_eq!(convert_scalar("false", Some(DataType::Boolean)), Scalar::Bool(false));
        assert_eq!(convert_scalar("yes", Some(DataType::Boolean)), Scalar::Bool(true));
    }

    #[test]
    fn dates_pass_through() {
        assert_eq!(
            convert_scalar("2024-01-31T10:00", Some(DataType::DateTime)),
            Scalar::Text("2024-01-31T10:00".to_string())
        );
    }

    #[test]
    fn between_accepts_every_input_form() {
        let expected = CellValue::List(vec![Scalar::Number(1.0), Scalar::Number(2.0)]);
        let numeric = Some(DataType::Numeric);
        assert_eq!(convert(&"1,2".into(), numeric, &op("between")), expected);
        assert_eq!(
            convert(
                &RawInput::List(vec!["1".into(), "2".into()]),
                numeric,
                &op("between")
            ),
            expected
        );
        assert_eq!(
            convert(
                &RawInput::Range {
                    min: "1".into(),
                    max: "2".into()
                },
                numeric,
                &op("between")
            ),
            expected
        );
    }

    #[test]
    fn between_preserves_partial_input() {
        let numeric = Some(DataType::Numeric);
        assert_eq!(
            convert(&"10".into(), numeric, &op("between")),
            CellValue::Scalar(Scalar::Text("10".to_string()))
        );
        assert_eq!(
            convert(&"10,".into(), numeric, &op("between")),
            CellValue::List(vec![Scalar::Number(10.0), Scalar::empty()])
        );
    }

    #[test]
    fn in_list_trims_and_keeps_empty_slots() {
        assert_eq!(
            convert(&"1, ,3".into(), Some(DataType::Numeric), &op("not in")),
            CellValue::List(vec![
                Scalar::Number(1.0),
                Scalar::empty(),
                Scalar::Number(3.0)
            ])
        );
    }

    #[test]
    fn empty_input_is_never_null() {
        assert_eq!(convert(&RawInput::Null, None, &op("equal")), CellValue::empty());
        assert_eq!(
            convert_result(&ResultInput::Raw(RawInput::Null), Some(DataType::Numeric)),
            ResultValue::empty()
        );
    }

    #[test]
    fn display_round_trips_ranges() {
        let numeric = Some(DataType::Numeric);
        let stored = convert(&"10,20".into(), numeric, &op("between"));
        let again = convert(&stored.to_display().into(), numeric, &op("between"));
        assert_eq!(stored, again);
    }
}
