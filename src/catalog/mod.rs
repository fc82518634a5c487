//! Interfaces to the external lookup services the grid depends on, plus an in-memory
//! implementation for tools and tests.
use crate::error::LookupError;
use crate::model::{Binding, DataType, SourceType};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;

/// An attribute that a condition or result can bind to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub name: String,
    #[serde(default, alias = "data_type")]
    pub data_type: Option<DataType>,
    #[serde(default, alias = "source_type")]
    pub source_type: Option<SourceType>,
}

impl AttributeInfo {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type),
            source_type: None,
        }
    }
}

/// The two attribute groups the catalog returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeGroups {
    #[serde(default)]
    pub global: Vec<AttributeInfo>,
    #[serde(default)]
    pub input: Vec<AttributeInfo>,
}

impl AttributeGroups {
    /// Resolves `property` to a binding, searching global attributes first. The group an
    /// attribute was found in supplies its source type unless the entry names one.
    pub fn resolve(&self, property: &str) -> Option<Binding> {
        let global = self.global.iter().map(|a| (a, SourceType::Global));
        let input = self.input.iter().map(|a| (a, SourceType::Input));
        global
            .chain(input)
            .find(|(attribute, _)| attribute.name == property)
            .map(|(attribute, group)| {
                Binding::new(
                    property,
                    Some(attribute.source_type.unwrap_or(group)),
                    attribute.data_type,
                )
            })
    }
}

/// One operator choice for a data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInfo {
    pub key: String,
    #[serde(default, alias = "display_name")]
    pub display_name: String,
}

impl OperatorInfo {
    pub fn new(key: &str, display_name: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

pub trait AttributeCatalog {
    fn attributes(&self) -> Result<AttributeGroups, LookupError>;
}

pub trait OperatorCatalog {
    /// The ordered operators valid for `data_type`.
    fn operators(&self, data_type: DataType) -> Result<Vec<OperatorInfo>, LookupError>;
}

pub trait DataTypeCatalog {
    /// Data types a result column may take.
    fn result_data_types(&self) -> Result<Vec<DataType>, LookupError>;
    /// Predefined attribute names a result column can be created from.
    fn attribute_library(&self) -> Result<Vec<AttributeInfo>, LookupError>;
}

/// The operator table used when a catalog does not provide its own.
pub fn default_operators(data_type: DataType) -> Vec<OperatorInfo> {
    let common = [
        OperatorInfo::new("equal", "Equal"),
        OperatorInfo::new("notEqual", "Not equal"),
    ];
    let specific: Vec<OperatorInfo> = match data_type {
        DataType::String => vec![
            OperatorInfo::new("contains", "Contains"),
            OperatorInfo::new("doesNotContain", "Does not contain"),
            OperatorInfo::new("in", "In"),
            OperatorInfo::new("not in", "Not in"),
        ],
        DataType::Numeric => vec![
            OperatorInfo::new("lessThan", "Less than"),
            OperatorInfo::new("lessThanInclusive", "Less than or equal"),
            OperatorInfo::new("greaterThan", "Greater than"),
            OperatorInfo::new("greaterThanInclusive", "Greater than or equal"),
            OperatorInfo::new("between", "Between"),
            OperatorInfo::new("in", "In"),
            OperatorInfo::new("not in", "Not in"),
        ],
        DataType::Boolean => Vec::new(),
        DataType::Date | DataType::DateTime => vec![
            OperatorInfo::new("lessThan", "Before"),
            OperatorInfo::new("greaterThan", "After"),
            OperatorInfo::new("between", "Between"),
        ],
    };
    common
        .into_iter()
        .chain(specific)
        .chain([
            OperatorInfo::new("any", "Any"),
            OperatorInfo::new("exists", "Exists"),
        ])
        .collect()
}

/// A catalog held entirely in memory, loadable from JSON:
///
/// ```json
/// { "global": [{ "name": "country", "dataType": "String" }],
///   "input": [{ "name": "age", "dataType": "Numeric" }],
///   "operators": { "Numeric": [{ "key": "between", "displayName": "Between" }] },
///   "resultDataTypes": ["String", "Numeric"],
///   "library": [{ "name": "score", "dataType": "Numeric" }] }
/// ```
///
/// Data types without an `operators` entry fall back to [`default_operators`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCatalog {
    #[serde(flatten)]
    pub attributes: AttributeGroups,
    #[serde(default)]
    pub operators: AHashMap<DataType, Vec<OperatorInfo>>,
    #[serde(default, alias = "result_data_types")]
    pub result_data_types: Vec<DataType>,
    #[serde(default)]
    pub library: Vec<AttributeInfo>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &str) -> Result<Self, LookupError> {
        let content = fs::read_to_string(path).map_err(|e| LookupError::Unreachable {
            service: "catalog",
            message: format!("Could not read '{}': {}", path, e),
        })?;
        serde_json::from_str(&content).map_err(|e| LookupError::Failed {
            service: "catalog",
            message: format!("Could not parse '{}': {}", path, e),
        })
    }

    pub fn with_global(mut self, name: &str, data_type: DataType) -> Self {
        self.attributes.global.push(AttributeInfo::new(name, data_type));
        self
    }

    pub fn with_input(mut self, name: &str, data_type: DataType) -> Self {
        self.attributes.input.push(AttributeInfo::new(name, data_type));
        self
    }

    pub fn with_operators(mut self, data_type: DataType, operators: Vec<OperatorInfo>) -> Self {
        self.operators.insert(data_type, operators);
        self
    }
}

impl AttributeCatalog for StaticCatalog {
    fn attributes(&self) -> Result<AttributeGroups, LookupError> {
        Ok(self.attributes.clone())
    }
}

impl OperatorCatalog for StaticCatalog {
    fn operators(&self, data_type: DataType) -> Result<Vec<OperatorInfo>, LookupError> {
        Ok(self
            .operators
            .get(&data_type)
            .cloned()
            .unwrap_or_else(|| default_operators(data_type)))
    }
}

impl DataTypeCatalog for StaticCatalog {
    fn result_data_types(&self) -> Result<Vec<DataType>, LookupError> {
        if self.result_data_types.is_empty() {
            Ok(DataType::ALL.to_vec())
        } else {
            Ok(self.result_data_types.clone())
        }
    }

    fn attribute_library(&self) -> Result<Vec<AttributeInfo>, LookupError> {
        Ok(self.library.clone())
    }
}
