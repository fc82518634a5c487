//! Loading persisted payloads, saving them back, and replaying edit commands.
mod common;
use common::*;
use rulegrid::prelude::*;
use std::fs;
use std::path::PathBuf;
use ulid::Ulid;

fn hydrated() -> DecisionGrid {
    let payload = RulePayload::from_json(PERSISTED_PAYLOAD_JSON).unwrap();
    DecisionGrid::from_payload(payload)
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("rulegrid-test-{}", Ulid::new()))
}

#[test]
fn test_schema_is_derived_from_persisted_rows() {
    let grid = hydrated();
    let columns = grid.schema().columns();
    assert_eq!(columns.len(), 4);

    match &columns[0].kind {
        ColumnKind::Condition(binding) => {
            assert_eq!(binding.property, "age");
            assert_eq!(binding.data_type, Some(DataType::Numeric));
        }
        other => panic!("expected a condition column, found {:?}", other),
    }
    match &columns[1].kind {
        ColumnKind::Group { operator, slots } => {
            assert_eq!(*operator, GroupOperator::All);
            let names: Vec<&str> = slots.iter().map(|s| s.property.as_str()).collect();
            assert_eq!(names, vec!["country", "member"]);
        }
        other => panic!("expected a group column, found {:?}", other),
    }
    let keys: Vec<&str> = grid.schema().result_fields().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, vec!["discount", "tier"]);

    let (_, discount) = grid.schema().result_column("discount").unwrap();
    assert_eq!(discount.data_type, Some(DataType::Numeric));
    assert!(discount.is_from_external_source);
    let (_, tier) = grid.schema().result_column("tier").unwrap();
    assert_eq!(tier.data_type, Some(DataType::String));
    assert_eq!(grid.schema().outer_operator(), GroupOperator::Any);
}

#[test]
fn test_hydrated_rows_are_sorted_and_repaired() {
    let grid = hydrated();
    let rows = grid.rows();
    assert!(grid.snapshot().is_consistent());
    assert!(grid.cache().is_empty());

    assert_eq!(rows[0].id, "r-1-local");
    assert_eq!(rows[1].id, "1717171717000");
    assert_eq!(rows[1].priority, 2);
    assert!(!rows[1].enabled);

    // The short group was padded with the template's missing slot.
    let padded = rows[0].leaf(1, 1).unwrap();
    assert_eq!(padded.property, "member");
    assert!(padded.operator.is_unset());
    assert_eq!(rows[0].result.get("tier"), Some(&ResultValue::empty()));
    assert!(rows[1].result["tier"].is_bound());

    assert_eq!(grid.decision_id(), Some("dt-7"));
    assert!(rows.iter().all(|r| r.decision_id.as_deref() == Some("dt-7")));
    assert_eq!(
        rows[1].leaf(0, 0).unwrap().value,
        CellValue::List(vec![Scalar::Number(18.0), Scalar::Number(30.0)])
    );
}

#[test]
fn test_mismatched_nodes_are_replaced_with_defaults() {
    let json = r#"{ "rules": [
        { "id": "a", "priority": 1, "conditionGroup": { "operator": "all", "rules": [
            { "operator": "any", "isGroup": true, "rules": [
                { "property": "country", "sourceType": "global", "dataType": "String",
                  "operator": "equal", "value": "DE" } ] } ] },
          "result": {} },
        { "id": "b", "priority": 2, "conditionGroup": { "operator": "all", "rules": [
            { "property": "age", "operator": "equal", "value": 1 },
            { "property": "stray", "operator": "equal", "value": 2 } ] },
          "result": { "late": "x" } }
    ] }"#;
    let grid = DecisionGrid::from_payload(RulePayload::from_json(json).unwrap());

    assert!(grid.snapshot().is_consistent());
    assert_eq!(grid.schema().condition_count(), 1);
    match &grid.rows()[1].condition_group.rules[0] {
        RuleNode::Group(group) => {
            assert_eq!(group.operator, GroupOperator::Any);
            assert_eq!(group.rules[0].property, "country");
            assert!(group.rules[0].operator.is_unset());
        }
        other => panic!("expected a group, found {:?}", other),
    }
    assert_eq!(grid.rows()[0].result.get("late"), Some(&ResultValue::empty()));
}

#[test]
fn test_empty_payload_gets_a_default_column() {
    let grid = DecisionGrid::from_payload(RulePayload::default());
    assert_eq!(grid.schema().len(), 1);
    assert!(grid.rows().is_empty());
    assert_eq!(grid.decision_id(), None);
}

#[test]
fn test_hydration_validates_incomplete_rows() {
    let grid = hydrated();
    assert_eq!(
        grid.validate(),
        vec![ValidationIssue::MissingOperator {
            row: 0,
            column: 1,
            inner: 1
        }]
    );
}

#[test]
fn test_save_and_reload_through_a_file_store() {
    let dir = scratch_dir();
    let store = JsonFileStore::new(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(store.path_for("dt-7"), PERSISTED_PAYLOAD_JSON).unwrap();

    let mut grid = DecisionGrid::load(&store, "dt-7", GridConfig::default()).unwrap();
    grid.add_row().unwrap();
    grid.set_result_value(2, "discount", "25").unwrap();
    let response = grid.save(&store, Some("workspace-1")).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Saved 3 rules");

    let stored = RulePayload::from_json(&fs::read_to_string(store.path_for("dt-7")).unwrap())
        .unwrap();
    assert_eq!(stored.actions.len(), 1);
    assert_eq!(stored.rule_policy, Some(serde_json::json!("first")));

    let reloaded = DecisionGrid::load(&store, "dt-7", GridConfig::default()).unwrap();
    assert_eq!(reloaded.rows(), grid.rows());
    assert_eq!(reloaded.schema().len(), grid.schema().len());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_missing_payload_and_missing_decision_id() {
    let store = JsonFileStore::new(scratch_dir());
    assert!(matches!(
        DecisionGrid::load(&store, "nope", GridConfig::default()),
        Err(PersistenceError::NotFound(id)) if id == "nope"
    ));

    let grid = DecisionGrid::default();
    assert!(matches!(
        grid.save(&store, None),
        Err(PersistenceError::Rejected(_))
    ));
}

#[test]
fn test_decision_id_is_stamped_on_every_row() {
    let mut grid = hydrated();
    grid.set_decision_id("dt-8").unwrap();
    grid.add_row().unwrap();
    assert!(grid.rows().iter().all(|r| r.decision_id.as_deref() == Some("dt-8")));

    let request = grid.save_request(Some("ws")).unwrap();
    assert_eq!(request.decision_id, "dt-8");
    assert_eq!(request.rules.len(), 3);
}

#[test]
fn test_commands_replay_from_json() {
    let script = r#"[
        { "op": "addRow" },
        { "op": "setCellOperator", "row": 2, "column": 0, "operator": "greaterThan" },
        { "op": "setCellValue", "row": 2, "column": 0, "value": "65" },
        { "op": "setResultValue", "row": 2, "key": "discount", "value": "20" },
        { "op": "setResultValue", "row": 2, "key": "tier",
          "value": { "sourceType": "input", "value": "memberTier",
                     "isAttributeData": true, "dataType": "String" } },
        { "op": "insertColumn", "index": 1,
          "column": { "kind": "condition", "property": "member" } },
        { "op": "updateSharedOperator", "operator": "all" }
    ]"#;
    let commands: Vec<EditCommand> = serde_json::from_str(script).unwrap();
    let catalog = catalog();
    let mut grid = hydrated();
    for command in &commands {
        grid.apply(command, &catalog).unwrap();
    }

    let row = &grid.rows()[2];
    assert_eq!(row.leaf(0, 0).unwrap().value, CellValue::Scalar(Scalar::Number(65.0)));
    assert_eq!(row.leaf(1, 0).unwrap().property, "member");
    assert_eq!(row.result["discount"], ResultValue::Literal(Scalar::Number(20.0)));
    assert!(row.result["tier"].is_bound());
    assert_eq!(row.condition_group.operator, GroupOperator::All);
    assert_eq!(grid.schema().condition_count(), 3);
}

#[test]
fn test_property_commands_return_issues() {
    let mut grid = two_condition_grid(1);
    let command = EditCommand::SetColumnProperty {
        column: 0,
        property: "unknown".to_string(),
    };
    let report = grid.apply(&command, &catalog()).unwrap();
    assert!(!report.is_clean());
}

#[test]
fn test_failed_command_changes_nothing() {
    let mut grid = hydrated();
    let before = grid.snapshot();
    let command: EditCommand =
        serde_json::from_str(r#"{ "op": "deleteRow", "index": 9 }"#).unwrap();
    assert_eq!(
        grid.apply(&command, &catalog()),
        Err(GridError::RowOutOfRange { index: 9, len: 2 })
    );
    assert_eq!(grid.snapshot(), before);
    assert!(!grid.can_undo());
}

#[test]
fn test_history_limit_comes_from_config() {
    let config: GridConfig = serde_json::from_str(r#"{ "historyLimit": 2 }"#).unwrap();
    assert!(config.strict_operators);

    let mut grid = DecisionGrid::builder().with_config(config).build();
    for _ in 0..3 {
        grid.add_row().unwrap();
    }
    assert!(grid.undo());
    assert!(grid.undo());
    assert!(!grid.undo());
    assert_eq!(grid.rows().len(), 2);
    assert!(grid.can_redo());
}

const NULLS_PAYLOAD_JSON: &str = r#"{
  "rules": [
    {
      "id": "r-1",
      "priority": 1,
      "conditionGroup": {
        "operator": "all",
        "rules": [
          { "property": "age", "sourceType": "input", "dataType": "Numeric",
            "operator": "exists", "value": null },
          { "property": "income", "sourceType": null, "dataType": null,
            "operator": null, "value": [null, 30] }
        ]
      },
      "result": { "score": null, "tier": "gold" }
    },
    {
      "id": "r-2",
      "priority": 2,
      "conditionGroup": { "operator": "all", "rules": [] },
      "result": { "score": 5 }
    },
    {
      "id": "r-3",
      "priority": 3,
      "conditionGroup": { "operator": "all", "rules": [] },
      "result": null
    }
  ]
}"#;

#[test]
fn test_null_values_load_as_empty() {
    let payload = RulePayload::from_json(NULLS_PAYLOAD_JSON).unwrap();
    let first = &payload.rules[0];

    let exists = first.leaf(0, 0).unwrap();
    assert_eq!(exists.operator, Operator::new("exists"));
    assert_eq!(exists.value, CellValue::empty());

    let unset = first.leaf(1, 0).unwrap();
    assert!(unset.operator.is_unset());
    assert_eq!(unset.data_type, None);
    assert_eq!(unset.value, CellValue::List(vec![Scalar::empty(), Scalar::Number(30.0)]));

    assert_eq!(first.result.get("score"), Some(&ResultValue::empty()));
    assert!(payload.rules[2].result.is_empty());

    // The null score is skipped when typing the column; the next row decides.
    let grid = DecisionGrid::from_payload(payload);
    let fields: Vec<(&str, Option<DataType>)> = grid
        .schema()
        .result_fields()
        .map(|f| (f.key.as_str(), f.data_type))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("score", Some(DataType::Numeric)),
            ("tier", Some(DataType::String))
        ]
    );
    assert_eq!(grid.rows()[2].result.get("tier"), Some(&ResultValue::empty()));
}

#[test]
fn test_result_column_order_survives_save_and_reload() {
    let mut grid = DecisionGrid::builder().with_decision_id("order").build();
    grid.add_result_column(ResultField::new("zeta", None)).unwrap();
    grid.add_result_column(ResultField::new("alpha", None)).unwrap();
    grid.insert_column(2, ColumnKind::Result(ResultField::new("mid", None))).unwrap();
    grid.configure_result_column(1, &ResultConfig::new("omega")).unwrap();
    grid.add_row().unwrap();

    let expected = vec!["omega", "mid", "alpha"];
    for row in grid.rows() {
        let keys: Vec<&str> = row.result.keys().map(String::as_str).collect();
        assert_eq!(keys, expected);
    }

    let json = grid.to_payload().to_json().unwrap();
    let omega = json.find("\"omega\"").unwrap();
    let alpha = json.find("\"alpha\"").unwrap();
    assert!(omega < alpha);

    let reloaded = DecisionGrid::from_payload(RulePayload::from_json(&json).unwrap());
    let keys: Vec<&str> = reloaded
        .schema()
        .result_fields()
        .map(|f| f.key.as_str())
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_payload_sections_are_written_back() {
    let mut grid = hydrated();
    grid.add_row().unwrap();

    let payload = grid.to_payload();
    assert_eq!(payload.rules.len(), 3);
    assert_eq!(payload.actions, vec![serde_json::json!({ "type": "notify" })]);
    assert_eq!(payload.rule_policy, Some(serde_json::json!("first")));
}

#[test]
fn test_whole_numbers_are_written_as_integers() {
    let mut grid = hydrated();
    grid.set_result_value(0, "discount", "12.5").unwrap();

    let json = grid.to_payload().to_json().unwrap();
    assert!(json.contains("\"discount\": 12.5"));
    assert!(json.contains("\"discount\": 10"));
    assert!(!json.contains("10.0"));
    assert!(!json.contains("18.0"));
}
