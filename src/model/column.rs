use super::value::lenient_tag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The value type of an attribute, condition cell, or result field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(alias = "string", alias = "text")]
    String,
    #[serde(alias = "numeric", alias = "number")]
    Numeric,
    #[serde(alias = "boolean", alias = "bool")]
    Boolean,
    #[serde(alias = "date")]
    Date,
    #[serde(alias = "datetime", alias = "dateTime")]
    DateTime,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::String,
        DataType::Numeric,
        DataType::Boolean,
        DataType::Date,
        DataType::DateTime,
    ];
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::String => "String",
            DataType::Numeric => "Numeric",
            DataType::Boolean => "Boolean",
            DataType::Date => "Date",
            DataType::DateTime => "DateTime",
        };
        f.write_str(name)
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "text" => Ok(DataType::String),
            "numeric" | "number" => Ok(DataType::Numeric),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "datetime" => Ok(DataType::DateTime),
            other => Err(format!("unknown data type '{}'", other)),
        }
    }
}

/// Where a bound attribute comes from, as classified by the attribute catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Global,
    Input,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Global => f.write_str("global"),
            SourceType::Input => f.write_str("input"),
        }
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(SourceType::Global),
            "input" => Ok(SourceType::Input),
            other => Err(format!("unknown source type '{}'", other)),
        }
    }
}

/// AND/OR combinator for the outer condition group and for group columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOperator {
    #[default]
    All,
    Any,
}

/// The attribute a condition column (or one group slot) is bound to.
/// An empty `property` means nothing has been chosen yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    #[serde(default)]
    pub property: String,
    #[serde(default, alias = "source_type", deserialize_with = "lenient_tag")]
    pub source_type: Option<SourceType>,
    #[serde(default, alias = "data_type", deserialize_with = "lenient_tag")]
    pub data_type: Option<DataType>,
}

impl Binding {
    pub fn new(
        property: impl Into<String>,
        source_type: Option<SourceType>,
        data_type: Option<DataType>,
    ) -> Self {
        Self {
            property: property.into(),
            source_type,
            data_type,
        }
    }

    /// A binding for `property` whose type information could not be resolved.
    pub fn unresolved(property: impl Into<String>) -> Self {
        Self::new(property, None, None)
    }

    pub fn is_bound(&self) -> bool {
        !self.property.trim().is_empty()
    }
}

/// Output field definition of a result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultField {
    #[serde(alias = "result_key")]
    pub key: String,
    #[serde(default, alias = "display_name")]
    pub display_name: String,
    #[serde(default, alias = "data_type", deserialize_with = "lenient_tag")]
    pub data_type: Option<DataType>,
    /// True when the key came from a persisted rule; such keys are read-only.
    #[serde(default, alias = "is_from_external_source")]
    pub is_from_external_source: bool,
}

impl ResultField {
    /// A result field created during the current editing session.
    pub fn new(key: impl Into<String>, data_type: Option<DataType>) -> Self {
        let key = key.into();
        Self {
            display_name: key.clone(),
            key,
            data_type,
            is_from_external_source: false,
        }
    }
}

/// What a column holds. Group columns own the template shared by every row's group node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnKind {
    Condition(Binding),
    Group {
        #[serde(default)]
        operator: GroupOperator,
        slots: Vec<Binding>,
    },
    Result(ResultField),
}

impl ColumnKind {
    /// An empty group column with a single unbound slot.
    pub fn empty_group() -> Self {
        ColumnKind::Group {
            operator: GroupOperator::All,
            slots: vec![Binding::default()],
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self, ColumnKind::Result(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Condition(_) => "condition",
            ColumnKind::Group { .. } => "group",
            ColumnKind::Result(_) => "result",
        }
    }
}

/// Synthetic column identity, stable across moves. Only used as a rendering key;
/// every operation addresses columns by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub id: ColumnId,
    pub kind: ColumnKind,
}

impl ColumnDefinition {
    pub fn result_field(&self) -> Option<&ResultField> {
        match &self.kind {
            ColumnKind::Result(field) => Some(field),
            _ => None,
        }
    }

    pub fn is_result(&self) -> bool {
        self.kind.is_result()
    }
}
