//! Common fixtures for building catalogs, grids, and payloads.
use rulegrid::prelude::*;

/// Attributes: `country` (global, String), `age` and `member` (input).
#[allow(dead_code)]
pub fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_global("country", DataType::String)
        .with_input("age", DataType::Numeric)
        .with_input("member", DataType::Boolean)
}

/// Columns: `0` country, `1` age, `2` result `total` (Numeric). `rows` rows.
#[allow(dead_code)]
pub fn two_condition_grid(rows: usize) -> DecisionGrid {
    let catalog = catalog();
    let mut grid = DecisionGrid::builder()
        .with_decision_id("pricing")
        .with_seed_row(false)
        .build();
    grid.set_column_property(&catalog, 0, "country")
        .expect("bind country");
    grid.add_condition_column().expect("add age column");
    grid.set_column_property(&catalog, 1, "age").expect("bind age");
    grid.add_result_column(ResultField::new("total", Some(DataType::Numeric)))
        .expect("add result column");
    for _ in 0..rows {
        grid.add_row().expect("add row");
    }
    grid.clear_history();
    grid
}

#[allow(dead_code)]
pub fn key(raw: &str) -> CacheKey {
    raw.parse().expect("valid cache key")
}

/// A persisted payload with a leaf, a two-slot group, and two result keys.
#[allow(dead_code)]
pub const PERSISTED_PAYLOAD_JSON: &str = r#"{
  "rules": [
    {
      "id": 1717171717000,
      "priority": 2,
      "enabled": false,
      "decisionId": "dt-7",
      "subId": "r-2",
      "conditionGroup": {
        "operator": "any",
        "rules": [
          { "property": "age", "sourceType": "input", "dataType": "Numeric",
            "operator": "between", "value": [18, 30] },
          { "operator": "all", "isGroup": true, "rules": [
              { "property": "country", "sourceType": "global", "dataType": "String",
                "operator": "in", "value": ["DE", "FR"] },
              { "property": "member", "sourceType": "input", "dataType": "Boolean",
                "operator": "equal", "value": true }
          ] }
        ]
      },
      "result": {
        "discount": 10,
        "tier": { "sourceType": "global", "value": "defaultTier",
                  "isAttributeData": true, "dataType": "String" }
      }
    },
    {
      "id": "r-1-local",
      "priority": 1,
      "enabled": true,
      "decisionId": "dt-7",
      "conditionGroup": {
        "operator": "any",
        "rules": [
          { "property": "age", "sourceType": "input", "dataType": "Numeric",
            "operator": "lessThan", "value": 18 },
          { "operator": "all", "isGroup": true, "rules": [
              { "property": "country", "sourceType": "global", "dataType": "String",
                "operator": "equal", "value": "DE" }
          ] }
        ]
      },
      "result": { "discount": 0 }
    }
  ],
  "actions": [{ "type": "notify" }],
  "rulePolicy": "first"
}"#;
