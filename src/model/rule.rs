use super::column::{Binding, DataType, GroupOperator, SourceType};
use super::value::{
    CellValue, Marker, ResultValue, Scalar, lenient_tag, null_as_default, string_or_number,
};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// How an operator shapes the value it compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    /// Two-element `[min, max]` list.
    Range,
    /// Arbitrary-length list.
    List,
}

/// An operator key as supplied by the operator catalog (`equal`, `between`, `in`, ...).
/// An empty key means no operator has been chosen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Operator(String);

impl Operator {
    pub fn new(key: impl Into<String>) -> Self {
        Operator(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    pub fn is_unset(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn shape(&self) -> ValueShape {
        match self.0.trim().to_ascii_lowercase().as_str() {
            "between" => ValueShape::Range,
            "in" | "not in" | "notin" | "not_in" => ValueShape::List,
            _ => ValueShape::Scalar,
        }
    }

    /// `between`, `in` and `not in` hold arrays rather than scalars.
    pub fn is_composite(&self) -> bool {
        self.shape() != ValueShape::Scalar
    }

    /// `any` and `exists` take no comparison value.
    pub fn requires_value(&self) -> bool {
        !matches!(
            self.0.trim().to_ascii_lowercase().as_str(),
            "" | "any" | "exists"
        )
    }

    /// The value a cell is reset to when this operator is selected.
    pub fn empty_value(&self) -> CellValue {
        match self.shape() {
            ValueShape::Scalar => CellValue::empty(),
            ValueShape::Range => CellValue::List(vec![Scalar::empty(), Scalar::empty()]),
            ValueShape::List => CellValue::List(Vec::new()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Operator {
    fn from(key: &str) -> Self {
        Operator::new(key)
    }
}

/// A single comparison in a row's condition tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionLeaf {
    #[serde(default, deserialize_with = "null_as_default")]
    pub property: String,
    #[serde(default, alias = "source_type", deserialize_with = "lenient_tag")]
    pub source_type: Option<SourceType>,
    #[serde(default, alias = "data_type", deserialize_with = "lenient_tag")]
    pub data_type: Option<DataType>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub operator: Operator,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: CellValue,
}

impl ConditionLeaf {
    /// A leaf bound like `binding` with no operator or value yet.
    pub fn from_binding(binding: &Binding) -> Self {
        Self {
            property: binding.property.clone(),
            source_type: binding.source_type,
            data_type: binding.data_type,
            operator: Operator::default(),
            value: CellValue::empty(),
        }
    }

    pub fn binding(&self) -> Binding {
        Binding::new(self.property.clone(), self.source_type, self.data_type)
    }

    pub fn rebind(&mut self, binding: &Binding) {
        self.property = binding.property.clone();
        self.source_type = binding.source_type;
        self.data_type = binding.data_type;
    }

    pub fn clear_comparison(&mut self) {
        self.operator = Operator::default();
        self.value = CellValue::empty();
    }
}

/// A nested AND/OR cluster of leaves. Groups never contain groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    #[serde(default)]
    pub operator: GroupOperator,
    #[serde(alias = "is_group")]
    is_group: Marker,
    #[serde(default)]
    pub rules: Vec<ConditionLeaf>,
}

impl GroupNode {
    pub fn new(operator: GroupOperator, rules: Vec<ConditionLeaf>) -> Self {
        Self {
            operator,
            is_group: Marker,
            rules,
        }
    }

    /// A group whose leaves follow the given slot template.
    pub fn from_template(operator: GroupOperator, slots: &[Binding]) -> Self {
        Self::new(operator, slots.iter().map(ConditionLeaf::from_binding).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleNode {
    Group(GroupNode),
    Leaf(ConditionLeaf),
}

impl RuleNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            RuleNode::Group(_) => "group",
            RuleNode::Leaf(_) => "condition",
        }
    }
}

/// The single outer group of a row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(default)]
    pub operator: GroupOperator,
    #[serde(default)]
    pub rules: Vec<RuleNode>,
}

fn enabled_by_default() -> bool {
    true
}

/// Reads a result map where `null` stands for an empty map or an empty value.
fn result_map<'de, D>(deserializer: D) -> Result<IndexMap<String, ResultValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Option<ResultValue>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}

/// One row of the decision grid: an evaluatable rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRow {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, alias = "condition_group")]
    pub condition_group: ConditionGroup,
    /// Result values in column order.
    #[serde(default, deserialize_with = "result_map")]
    pub result: IndexMap<String, ResultValue>,
    #[serde(default, alias = "decision_id", skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
    /// Backend-assigned identifier of a persisted rule; absent on rows created locally.
    #[serde(default, alias = "sub_id", skip_serializing_if = "Option::is_none")]
    pub sub_id: Option<String>,
    /// Creation time in epoch milliseconds.
    #[serde(default, alias = "created_at")]
    pub created_at: u64,
}

impl RuleRow {
    pub fn leaf(&self, column: usize, inner: usize) -> Option<&ConditionLeaf> {
        match self.condition_group.rules.get(column)? {
            RuleNode::Leaf(leaf) if inner == 0 => Some(leaf),
            RuleNode::Leaf(_) => None,
            RuleNode::Group(group) => group.rules.get(inner),
        }
    }
}
