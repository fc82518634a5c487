//! Row insertion, duplication, deletion, reordering, and the pending cache relocation
//! that goes with them.
mod common;
use common::*;
use rulegrid::prelude::*;

fn priorities(grid: &DecisionGrid) -> Vec<u32> {
    grid.rows().iter().map(|r| r.priority).collect()
}

#[test]
fn test_new_grid_is_seeded_with_one_row() {
    let grid = DecisionGrid::default();
    assert_eq!(grid.schema().len(), 1);
    assert_eq!(grid.rows().len(), 1);
    assert_eq!(grid.rows()[0].priority, 1);
    assert!(grid.rows()[0].enabled);
    assert!(grid.snapshot().is_consistent());
}

#[test]
fn test_added_rows_follow_the_schema() {
    let grid = two_condition_grid(2);
    let row = &grid.rows()[1];
    assert_eq!(row.condition_group.rules.len(), 2);
    match &row.condition_group.rules[1] {
        RuleNode::Leaf(leaf) => {
            assert_eq!(leaf.property, "age");
            assert_eq!(leaf.data_type, Some(DataType::Numeric));
            assert_eq!(leaf.source_type, Some(SourceType::Input));
            assert!(leaf.operator.is_unset());
        }
        other => panic!("expected a leaf, found {:?}", other),
    }
    assert_eq!(row.result.get("total"), Some(&ResultValue::empty()));
    assert_eq!(row.decision_id.as_deref(), Some("pricing"));
}

#[test]
fn test_priorities_stay_contiguous() {
    let mut grid = two_condition_grid(3);
    grid.insert_row_above(0).unwrap();
    grid.insert_row_below(3).unwrap();
    grid.duplicate_row(1).unwrap();
    grid.delete_row(0).unwrap();
    grid.move_row(4, 0).unwrap();
    assert_eq!(priorities(&grid), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_insert_row_above_relocates_pending_input() {
    let mut grid = two_condition_grid(4);
    grid.stage_input(key("2-1-0"), "7").unwrap();
    grid.stage_input(key("3-1-0"), "8").unwrap();
    grid.stage_input(key("result-3-total"), "9").unwrap();
    grid.stage_input(key("1-1-0"), "stays").unwrap();

    grid.insert_row_above(2).unwrap();

    assert_eq!(grid.pending(&key("3-1-0")), Some("7"));
    assert_eq!(grid.pending(&key("4-1-0")), Some("8"));
    assert_eq!(grid.pending(&key("result-4-total")), Some("9"));
    assert_eq!(grid.pending(&key("1-1-0")), Some("stays"));
    assert_eq!(grid.pending(&key("2-1-0")), None);
    assert_eq!(grid.cache().len(), 4);
}

#[test]
fn test_insert_row_below_shifts_suffix_keys_with_their_base() {
    let mut grid = two_condition_grid(3);
    grid.stage_input(key("1-1-0-min"), "5").unwrap();
    grid.stage_input(key("1-1-0-max"), "15").unwrap();
    grid.stage_input(key("0-1-0-min"), "1").unwrap();

    grid.insert_row_below(0).unwrap();

    assert_eq!(grid.pending(&key("2-1-0-min")), Some("5"));
    assert_eq!(grid.pending(&key("2-1-0-max")), Some("15"));
    assert_eq!(grid.pending(&key("0-1-0-min")), Some("1"));
    assert_eq!(grid.cache().len(), 3);
}

#[test]
fn test_insert_row_below_rejects_missing_row() {
    let mut grid = two_condition_grid(2);
    let before = grid.snapshot();
    assert_eq!(
        grid.insert_row_below(2),
        Err(GridError::RowOutOfRange { index: 2, len: 2 })
    );
    assert_eq!(grid.snapshot(), before);
}

#[test]
fn test_duplicate_row_copies_in_flight_composite_input() {
    let mut grid = two_condition_grid(2);
    grid.set_cell_operator(0, 1, "between", 0).unwrap();
    grid.stage_input(key("0-1-0"), "5,15").unwrap();
    grid.stage_input(key("0-0-0"), "DE").unwrap();
    grid.stage_input(key("1-1-0"), "row one").unwrap();

    grid.duplicate_row(0).unwrap();

    assert_eq!(grid.pending(&key("0-1-0")), Some("5,15"));
    assert_eq!(grid.pending(&key("1-1-0")), Some("5,15"));
    // Scalar input is not carried over; the old row 1 moved down.
    assert_eq!(grid.pending(&key("1-0-0")), None);
    assert_eq!(grid.pending(&key("2-1-0")), Some("row one"));
}

#[test]
fn test_duplicate_row_gets_a_fresh_identity() {
    let payload = RulePayload::from_json(PERSISTED_PAYLOAD_JSON).unwrap();
    let mut grid = DecisionGrid::from_payload(payload);
    grid.duplicate_row(1).unwrap();

    let source = &grid.rows()[1];
    let copy = &grid.rows()[2];
    assert_ne!(copy.id, source.id);
    assert_eq!(source.sub_id.as_deref(), Some("r-2"));
    assert_eq!(copy.sub_id, None);
    assert_eq!(copy.condition_group, source.condition_group);
    assert_eq!(copy.result, source.result);
    assert_eq!(copy.priority, 3);
}

#[test]
fn test_delete_row_purges_and_shifts_pending_input() {
    let mut grid = two_condition_grid(3);
    grid.stage_input(key("0-0-0"), "a").unwrap();
    grid.stage_input(key("1-0-0"), "b").unwrap();
    grid.stage_input(key("1-1-0-max"), "b-max").unwrap();
    grid.stage_input(key("2-0-0"), "c").unwrap();
    grid.stage_input(key("result-2-total"), "c-total").unwrap();

    grid.delete_row(1).unwrap();

    assert_eq!(grid.rows().len(), 2);
    assert_eq!(grid.pending(&key("0-0-0")), Some("a"));
    assert_eq!(grid.pending(&key("1-0-0")), Some("c"));
    assert_eq!(grid.pending(&key("result-1-total")), Some("c-total"));
    assert_eq!(grid.pending(&key("1-1-0-max")), None);
    assert_eq!(grid.cache().len(), 3);
}

#[test]
fn test_move_row_carries_its_pending_input() {
    let mut grid = two_condition_grid(3);
    let moved_id = grid.rows()[2].id.clone();
    grid.stage_input(key("0-0-0"), "first").unwrap();
    grid.stage_input(key("2-0-0"), "last").unwrap();

    grid.move_row(2, 0).unwrap();

    assert_eq!(grid.rows()[0].id, moved_id);
    assert_eq!(grid.rows()[0].priority, 1);
    assert_eq!(grid.pending(&key("0-0-0")), Some("last"));
    assert_eq!(grid.pending(&key("1-0-0")), Some("first"));
}

#[test]
fn test_toggle_enabled_only_flips_the_flag() {
    let mut grid = two_condition_grid(2);
    let before = grid.rows()[1].clone();
    grid.toggle_enabled(1).unwrap();
    let after = &grid.rows()[1];
    assert!(!after.enabled);
    assert_eq!(after.condition_group, before.condition_group);
    assert_eq!(after.id, before.id);
}

#[test]
fn test_previous_snapshots_are_never_mutated() {
    let mut grid = two_condition_grid(2);
    let before = grid.snapshot();
    grid.set_cell_operator(0, 1, "equal", 0).unwrap();
    grid.set_cell_value(0, 1, 0, "42").unwrap();
    grid.duplicate_row(0).unwrap();

    assert_eq!(before.rows.len(), 2);
    assert!(before.rows[0].leaf(1, 0).unwrap().operator.is_unset());
    assert!(before.cache.is_empty());
}

#[test]
fn test_undo_and_redo_restore_whole_snapshots() {
    let mut grid = two_condition_grid(1);
    grid.stage_input(key("0-1-0"), "3").unwrap();
    let before = grid.snapshot();

    grid.insert_row_above(0).unwrap();
    assert_eq!(grid.pending(&key("1-1-0")), Some("3"));

    assert!(grid.undo());
    assert_eq!(grid.snapshot(), before);
    assert!(grid.redo());
    assert_eq!(grid.rows().len(), 2);
    assert!(!grid.redo());
}

#[test]
fn test_history_limit_zero_disables_undo() {
    let mut grid = DecisionGrid::builder().with_history_limit(0).build();
    grid.add_row().unwrap();
    assert!(!grid.can_undo());
    assert!(!grid.undo());
}
