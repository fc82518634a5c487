use super::GridSnapshot;
use crate::error::ValidationIssue;
use crate::model::{CellValue, ColumnKind, ConditionLeaf, DataType, RuleNode, Scalar, ValueShape};
use itertools::Itertools;

pub(super) fn validate(state: &GridSnapshot) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_columns(state, &mut issues);
    for (row_index, row) in state.rows.iter().enumerate() {
        for (column, node) in row.condition_group.rules.iter().enumerate() {
            match node {
                RuleNode::Leaf(leaf) => check_leaf(leaf, row_index, column, 0, &mut issues),
                RuleNode::Group(group) => {
                    for (inner, leaf) in group.rules.iter().enumerate() {
                        check_leaf(leaf, row_index, column, inner, &mut issues);
                    }
                }
            }
        }
        if let (Some(expected), Some(found)) = (&state.decision_id, &row.decision_id) {
            if expected != found {
                issues.push(ValidationIssue::InconsistentDecisionId {
                    row: row_index,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
    }
    issues
}

fn check_columns(state: &GridSnapshot, issues: &mut Vec<ValidationIssue>) {
    for (index, column) in state.schema.columns().iter().enumerate() {
        match &column.kind {
            ColumnKind::Condition(binding) if !binding.is_bound() => {
                issues.push(ValidationIssue::UnboundColumn { column: index, inner: 0 });
            }
            ColumnKind::Group { slots, .. } => {
                for (inner, slot) in slots.iter().enumerate() {
                    if !slot.is_bound() {
                        issues.push(ValidationIssue::UnboundColumn { column: index, inner });
                    }
                }
            }
            ColumnKind::Result(field) if field.key.trim().is_empty() => {
                issues.push(ValidationIssue::EmptyResultKey { column: index });
            }
            _ => {}
        }
    }

    let duplicates = state
        .schema
        .result_fields()
        .map(|f| f.key.as_str())
        .filter(|key| !key.trim().is_empty())
        .duplicates();
    for key in duplicates {
        issues.push(ValidationIssue::DuplicateResultKey {
            key: key.to_string(),
        });
    }
}

fn check_leaf(
    leaf: &ConditionLeaf,
    row: usize,
    column: usize,
    inner: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    if leaf.operator.is_unset() {
        issues.push(ValidationIssue::MissingOperator { row, column, inner });
        return;
    }
    if !leaf.operator.requires_value() {
        return;
    }

    match (leaf.operator.shape(), &leaf.value) {
        (ValueShape::Range, CellValue::List(bounds))
            if bounds.len() == 2 && !bounds.iter().any(Scalar::is_empty) => {}
        (ValueShape::Range, value) if value.is_empty() => {
            issues.push(ValidationIssue::EmptyValue { row, column, inner });
            return;
        }
        (ValueShape::Range, _) => {
            issues.push(ValidationIssue::IncompleteRange { row, column, inner });
            return;
        }
        (_, value) if value.is_empty() => {
            issues.push(ValidationIssue::EmptyValue { row, column, inner });
            return;
        }
        _ => {}
    }

    if leaf.data_type == Some(DataType::Numeric) {
        let scalars: Vec<&Scalar> = match &leaf.value {
            CellValue::Scalar(s) => vec![s],
            CellValue::List(items) => items.iter().collect(),
        };
        if let Some(Scalar::Text(text)) = scalars
            .into_iter()
            .find(|s| matches!(s, Scalar::Text(t) if !t.trim().is_empty()))
        {
            issues.push(ValidationIssue::NotNumeric {
                row,
                column,
                inner,
                value: text.clone(),
            });
        }
    }
}
