use crate::convert::{RawInput, ResultInput, convert, convert_result, reconvert_literal};
use crate::error::GridError;
use crate::model::{
    Binding, ColumnKind, ConditionLeaf, DataType, GroupOperator, Operator, ResultField,
    RuleNode, RuleRow,
};
use crate::schema::SchemaRegistry;
use serde::{Deserialize, Serialize};

/// Locates the leaf at `(column, inner)` in one row. Plain condition columns only have
/// slot 0.
fn leaf_mut(
    row: &mut RuleRow,
    row_index: usize,
    column: usize,
    inner: usize,
) -> Result<&mut ConditionLeaf, GridError> {
    match row.condition_group.rules.get_mut(column) {
        Some(RuleNode::Leaf(leaf)) if inner == 0 => Ok(leaf),
        Some(RuleNode::Leaf(_)) => Err(GridError::InnerRuleOutOfRange {
            column,
            inner,
            len: 1,
        }),
        Some(RuleNode::Group(group)) => {
            let len = group.rules.len();
            group
                .rules
                .get_mut(inner)
                .ok_or(GridError::InnerRuleOutOfRange { column, inner, len })
        }
        None => Err(GridError::SchemaDrift {
            row: row_index,
            column,
        }),
    }
}

fn row_mut(rows: &mut [RuleRow], index: usize) -> Result<&mut RuleRow, GridError> {
    let len = rows.len();
    rows.get_mut(index)
        .ok_or(GridError::RowOutOfRange { index, len })
}

fn group_slots_mut(
    schema: &mut SchemaRegistry,
    column: usize,
) -> Result<&mut Vec<Binding>, GridError> {
    match &mut schema.column_mut(column)?.kind {
        ColumnKind::Group { slots, .. } => Ok(slots),
        other => Err(GridError::KindMismatch {
            column,
            expected: "group",
            found: other.name(),
        }),
    }
}

/// Applies `edit` to the group node of `column` in every row.
fn for_each_group(
    rows: &mut [RuleRow],
    column: usize,
    mut edit: impl FnMut(&mut Vec<ConditionLeaf>),
) -> Result<(), GridError> {
    for (i, row) in rows.iter_mut().enumerate() {
        match row.condition_group.rules.get_mut(column) {
            Some(RuleNode::Group(group)) => edit(&mut group.rules),
            _ => return Err(GridError::SchemaDrift { row: i, column }),
        }
    }
    Ok(())
}

/// Converts `raw` for the cell's data type and operator and stores it.
pub fn set_cell_value(
    schema: &SchemaRegistry,
    rows: &[RuleRow],
    row: usize,
    column: usize,
    inner: usize,
    raw: &RawInput,
) -> Result<Vec<RuleRow>, GridError> {
    let data_type = schema.data_type(column, inner)?;
    let mut next = rows.to_vec();
    let leaf = leaf_mut(row_mut(&mut next, row)?, row, column, inner)?;
    leaf.value = convert(raw, data_type, &leaf.operator);
    Ok(next)
}

/// Sets the operator of one cell and resets its value to the operator's empty shape.
pub fn set_cell_operator(
    schema: &SchemaRegistry,
    rows: &[RuleRow],
    row: usize,
    column: usize,
    inner: usize,
    operator: &Operator,
) -> Result<Vec<RuleRow>, GridError> {
    schema.binding(column, inner)?;
    let mut next = rows.to_vec();
    let leaf = leaf_mut(row_mut(&mut next, row)?, row, column, inner)?;
    leaf.operator = operator.clone();
    leaf.value = operator.empty_value();
    Ok(next)
}

/// Stores a result value. Attribute bindings are kept verbatim; raw input is converted
/// for the column's data type.
pub fn set_result_value(
    schema: &SchemaRegistry,
    rows: &[RuleRow],
    row: usize,
    key: &str,
    input: &ResultInput,
) -> Result<Vec<RuleRow>, GridError> {
    let (_, field) = schema
        .result_column(key)
        .ok_or_else(|| GridError::UnknownResultKey(key.to_string()))?;
    let value = convert_result(input, field.data_type);
    let mut next = rows.to_vec();
    row_mut(&mut next, row)?.result.insert(key.to_string(), value);
    Ok(next)
}

/// Binds a condition column to a new attribute. Every row's leaf takes the binding and
/// loses its operator and value.
pub fn rebind_column(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    column: usize,
    binding: &Binding,
) -> Result<Vec<RuleRow>, GridError> {
    match &mut schema.column_mut(column)?.kind {
        ColumnKind::Condition(current) => *current = binding.clone(),
        other => {
            return Err(GridError::KindMismatch {
                column,
                expected: "condition",
                found: other.name(),
            });
        }
    }
    let mut next = rows.to_vec();
    for (i, row) in next.iter_mut().enumerate() {
        let leaf = leaf_mut(row, i, column, 0)?;
        leaf.rebind(binding);
        leaf.clear_comparison();
    }
    Ok(next)
}

/// Binds group slot `inner` to a new attribute, in the template and in every row.
pub fn rebind_group_slot(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    column: usize,
    inner: usize,
    binding: &Binding,
) -> Result<Vec<RuleRow>, GridError> {
    let slots = group_slots_mut(schema, column)?;
    let len = slots.len();
    *slots
        .get_mut(inner)
        .ok_or(GridError::InnerRuleOutOfRange { column, inner, len })? = binding.clone();

    let mut next = rows.to_vec();
    for (i, row) in next.iter_mut().enumerate() {
        let leaf = leaf_mut(row, i, column, inner)?;
        leaf.rebind(binding);
        leaf.clear_comparison();
    }
    Ok(next)
}

/// Appends an unbound slot to group `column`, in the template and in every row.
pub fn add_group_slot(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    column: usize,
) -> Result<Vec<RuleRow>, GridError> {
    let slots = group_slots_mut(schema, column)?;
    slots.push(Binding::default());
    let mut next = rows.to_vec();
    for_each_group(&mut next, column, |leaves| leaves.push(ConditionLeaf::default()))?;
    Ok(next)
}

/// Removes slot `inner` from group `column`. A group keeps at least one slot.
pub fn remove_group_slot(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    column: usize,
    inner: usize,
) -> Result<Vec<RuleRow>, GridError> {
    let slots = group_slots_mut(schema, column)?;
    if inner >= slots.len() {
        return Err(GridError::InnerRuleOutOfRange {
            column,
            inner,
            len: slots.len(),
        });
    }
    if slots.len() <= 1 {
        return Err(GridError::LastInnerRule { column });
    }
    slots.remove(inner);
    let mut next = rows.to_vec();
    for_each_group(&mut next, column, |leaves| {
        if inner < leaves.len() {
            leaves.remove(inner);
        }
    })?;
    Ok(next)
}

/// Sets the combinator of group `column` in the schema and in every row.
pub fn update_group_operator(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    column: usize,
    operator: GroupOperator,
) -> Result<Vec<RuleRow>, GridError> {
    schema.update_group_operator(column, operator)?;
    let mut next = rows.to_vec();
    for (i, row) in next.iter_mut().enumerate() {
        match row.condition_group.rules.get_mut(column) {
            Some(RuleNode::Group(group)) => group.operator = operator,
            _ => return Err(GridError::SchemaDrift { row: i, column }),
        }
    }
    Ok(next)
}

/// Sets the outer AND/OR shared by every row.
pub fn update_shared_operator(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    operator: GroupOperator,
) -> Vec<RuleRow> {
    schema.set_outer_operator(operator);
    let mut next = rows.to_vec();
    for row in &mut next {
        row.condition_group.operator = operator;
    }
    next
}

/// New settings for a result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultConfig {
    pub key: String,
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,
    #[serde(default, alias = "data_type")]
    pub data_type: Option<DataType>,
}

impl ResultConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: None,
            data_type: None,
        }
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// Reconfigures result column `column`. A new key migrates every row's value to it; a new
/// data type re-converts stored literals. Returns the rows and the previous field.
pub fn configure_result(
    schema: &mut SchemaRegistry,
    rows: &[RuleRow],
    column: usize,
    config: &ResultConfig,
) -> Result<(Vec<RuleRow>, ResultField), GridError> {
    let previous = match &schema.column(column)?.kind {
        ColumnKind::Result(field) => field.clone(),
        other => {
            return Err(GridError::KindMismatch {
                column,
                expected: "result",
                found: other.name(),
            });
        }
    };
    let renamed = config.key != previous.key;
    if renamed {
        if previous.is_from_external_source {
            return Err(GridError::ReadOnlyResultKey(previous.key));
        }
        schema.check_result_key(&config.key, Some(column))?;
    }
    let data_type = config.data_type.or(previous.data_type);
    let retyped = data_type != previous.data_type;

    if let ColumnKind::Result(field) = &mut schema.column_mut(column)?.kind {
        field.key = config.key.clone();
        field.data_type = data_type;
        if let Some(name) = &config.display_name {
            field.display_name = name.clone();
        } else if renamed && field.display_name == previous.key {
            field.display_name = config.key.clone();
        }
    }

    let mut next = rows.to_vec();
    for row in &mut next {
        let mut value = row.result.shift_remove(&previous.key).unwrap_or_default();
        if retyped {
            value = reconvert_literal(&value, data_type);
        }
        row.result.insert(config.key.clone(), value);
        super::align_results(schema, row);
    }
    Ok((next, previous))
}
