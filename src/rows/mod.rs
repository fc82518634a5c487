//! Row store operations.
//!
//! Every function takes the current rows by reference and returns a fresh `Vec`; no row
//! or nested node of the input is ever modified. Priorities are renumbered after every
//! structural change so that `rows[i].priority == i + 1`.
use crate::error::GridError;
use crate::model::{
    ColumnKind, ConditionGroup, ConditionLeaf, GroupNode, ResultValue, RuleNode, RuleRow,
};
use crate::schema::SchemaRegistry;
use indexmap::IndexMap;
use ulid::Ulid;

mod cells;

pub use cells::*;

/// A fresh id and its creation time in epoch milliseconds.
pub(crate) fn fresh_identity() -> (String, u64) {
    let id = Ulid::new();
    (id.to_string(), id.timestamp_ms())
}

/// The default rule node for a condition or group column; `None` for result columns.
pub fn default_node(kind: &ColumnKind) -> Option<RuleNode> {
    match kind {
        ColumnKind::Condition(binding) => {
            Some(RuleNode::Leaf(ConditionLeaf::from_binding(binding)))
        }
        ColumnKind::Group { operator, slots } => {
            Some(RuleNode::Group(GroupNode::from_template(*operator, slots)))
        }
        ColumnKind::Result(_) => None,
    }
}

/// Builds an empty row that follows the schema.
pub fn new_row(schema: &SchemaRegistry, decision_id: Option<&str>) -> RuleRow {
    let rules = schema
        .columns()
        .iter()
        .filter_map(|column| default_node(&column.kind))
        .collect();
    let result: IndexMap<String, ResultValue> = schema
        .result_fields()
        .map(|field| (field.key.clone(), ResultValue::empty()))
        .collect();
    let (id, created_at) = fresh_identity();

    RuleRow {
        id,
        priority: 0,
        enabled: true,
        condition_group: ConditionGroup {
            operator: schema.outer_operator(),
            rules,
        },
        result,
        decision_id: decision_id.map(str::to_string),
        sub_id: None,
        created_at,
    }
}

/// Recomputes every priority from the row order.
pub fn renumber(rows: &mut [RuleRow]) {
    for (i, row) in rows.iter_mut().enumerate() {
        row.priority = i as u32 + 1;
    }
}

fn check_row(rows: &[RuleRow], index: usize) -> Result<(), GridError> {
    if index < rows.len() {
        Ok(())
    } else {
        Err(GridError::RowOutOfRange {
            index,
            len: rows.len(),
        })
    }
}

pub fn add_row(
    schema: &SchemaRegistry,
    rows: &[RuleRow],
    decision_id: Option<&str>,
) -> Vec<RuleRow> {
    let mut next = rows.to_vec();
    next.push(new_row(schema, decision_id));
    renumber(&mut next);
    next
}

/// Inserts an empty row so that it ends up at position `at` (`at == len` appends).
pub fn insert_row(
    schema: &SchemaRegistry,
    rows: &[RuleRow],
    at: usize,
    decision_id: Option<&str>,
) -> Result<Vec<RuleRow>, GridError> {
    if at > rows.len() {
        return Err(GridError::RowOutOfRange {
            index: at,
            len: rows.len(),
        });
    }
    let mut next = rows.to_vec();
    next.insert(at, new_row(schema, decision_id));
    renumber(&mut next);
    Ok(next)
}

/// Clones row `index` right below itself with a fresh identity. The clone is treated as
/// a new rule: its backend identifier is dropped.
pub fn duplicate_row(rows: &[RuleRow], index: usize) -> Result<Vec<RuleRow>, GridError> {
    check_row(rows, index)?;
    let mut copy = rows[index].clone();
    let (id, created_at) = fresh_identity();
    copy.id = id;
    copy.created_at = created_at;
    copy.sub_id = None;

    let mut next = rows.to_vec();
    next.insert(index + 1, copy);
    renumber(&mut next);
    Ok(next)
}

pub fn delete_row(rows: &[RuleRow], index: usize) -> Result<Vec<RuleRow>, GridError> {
    check_row(rows, index)?;
    let mut next = rows.to_vec();
    next.remove(index);
    renumber(&mut next);
    Ok(next)
}

/// Moves row `from` to position `to`, changing its priority.
pub fn move_row(rows: &[RuleRow], from: usize, to: usize) -> Result<Vec<RuleRow>, GridError> {
    check_row(rows, from)?;
    check_row(rows, to)?;
    let mut next = rows.to_vec();
    let row = next.remove(from);
    next.insert(to, row);
    renumber(&mut next);
    Ok(next)
}

pub fn toggle_enabled(rows: &[RuleRow], index: usize) -> Result<Vec<RuleRow>, GridError> {
    check_row(rows, index)?;
    let mut next = rows.to_vec();
    next[index].enabled = !next[index].enabled;
    Ok(next)
}

/// Adds the node (or result key) for a column just inserted at `index` to every row.
pub fn insert_column_nodes(rows: &[RuleRow], index: usize, kind: &ColumnKind) -> Vec<RuleRow> {
    let mut next = rows.to_vec();
    for row in &mut next {
        match (kind, default_node(kind)) {
            (ColumnKind::Result(field), _) => {
                let at = index
                    .saturating_sub(row.condition_group.rules.len())
                    .min(row.result.len());
                row.result.shift_insert(at, field.key.clone(), ResultValue::empty());
            }
            (_, Some(node)) => {
                let at = index.min(row.condition_group.rules.len());
                row.condition_group.rules.insert(at, node);
            }
            (_, None) => {}
        }
    }
    next
}

/// Strips the node (or result key) of a column removed from `index` from every row.
pub fn remove_column_nodes(rows: &[RuleRow], index: usize, kind: &ColumnKind) -> Vec<RuleRow> {
    let mut next = rows.to_vec();
    for row in &mut next {
        match kind {
            ColumnKind::Result(field) => {
                row.result.shift_remove(&field.key);
            }
            _ if index < row.condition_group.rules.len() => {
                row.condition_group.rules.remove(index);
            }
            _ => {}
        }
    }
    next
}

/// Stamps `decision_id` on every row.
pub fn set_decision_id(rows: &[RuleRow], decision_id: &str) -> Vec<RuleRow> {
    let mut next = rows.to_vec();
    for row in &mut next {
        row.decision_id = Some(decision_id.to_string());
    }
    next
}

/// Reorders a row's result map to follow the schema's result columns.
pub(crate) fn align_results(schema: &SchemaRegistry, row: &mut RuleRow) {
    let order: Vec<&str> = schema.result_fields().map(|f| f.key.as_str()).collect();
    row.result.sort_by_cached_key(|key, _| {
        order
            .iter()
            .position(|k| *k == key.as_str())
            .unwrap_or(order.len())
    });
}

/// Brings hydrated rows in line with `schema`: sorts by stored priority, pads or replaces
/// rule nodes that do not match their column, trims extra nodes, fills missing result
/// keys, and renumbers. Returns the rows and the number of repairs made.
pub fn conform(schema: &SchemaRegistry, rows: Vec<RuleRow>) -> (Vec<RuleRow>, usize) {
    let mut next = rows;
    next.sort_by_key(|row| row.priority);
    let mut repairs = 0;
    let condition_count = schema.condition_count();

    for row in &mut next {
        let rules = &mut row.condition_group.rules;
        if rules.len() > condition_count {
            rules.truncate(condition_count);
            repairs += 1;
        }
        for (i, column) in schema.columns()[..condition_count].iter().enumerate() {
            let fits = match (&column.kind, rules.get_mut(i)) {
                (ColumnKind::Condition(_), Some(RuleNode::Leaf(_))) => true,
                (ColumnKind::Group { slots, .. }, Some(RuleNode::Group(group))) => {
                    if group.rules.len() != slots.len() {
                        group.rules.truncate(slots.len());
                        for slot in &slots[group.rules.len()..] {
                            group.rules.push(ConditionLeaf::from_binding(slot));
                        }
                        repairs += 1;
                    }
                    true
                }
                _ => false,
            };
            if !fits {
                let Some(node) = default_node(&column.kind) else {
                    continue;
                };
                if i < rules.len() {
                    rules[i] = node;
                } else {
                    rules.push(node);
                }
                repairs += 1;
            }
        }
        for field in schema.result_fields() {
            if !row.result.contains_key(&field.key) {
                row.result.insert(field.key.clone(), ResultValue::empty());
                repairs += 1;
            }
        }
        align_results(schema, row);
        if row.id.is_empty() {
            let (id, created_at) = fresh_identity();
            row.id = id;
            row.created_at = created_at;
        }
    }

    renumber(&mut next);
    (next, repairs)
}
