use super::{DecisionGrid, GridSnapshot, History};
use crate::cache::PendingInputCache;
use crate::model::RuleRow;
use crate::persistence::RulePayload;
use crate::rows;
use crate::schema::SchemaRegistry;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs;

/// Tunables for a [`DecisionGrid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// How many previous snapshots `undo` can step back through. 0 disables history.
    pub history_limit: usize,
    /// Reject operators missing from the last operator list fetched for a data type.
    pub strict_operators: bool,
    /// Start an empty grid with one blank row.
    pub seed_default_row: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            strict_operators: true,
            seed_default_row: true,
        }
    }
}

impl GridConfig {
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub struct GridBuilder {
    config: GridConfig,
    rows: Option<Vec<RuleRow>>,
    decision_id: Option<String>,
    actions: Vec<serde_json::Value>,
    rule_policy: Option<serde_json::Value>,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self {
            config: GridConfig::default(),
            rows: None,
            decision_id: None,
            actions: Vec::new(),
            rule_policy: None,
        }
    }

    pub fn with_config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn with_strict_operators(mut self, strict: bool) -> Self {
        self.config.strict_operators = strict;
        self
    }

    pub fn with_seed_row(mut self, seed: bool) -> Self {
        self.config.seed_default_row = seed;
        self
    }

    /// Hydrate from persisted rows instead of starting empty.
    pub fn with_rows(mut self, rows: Vec<RuleRow>) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Hydrate from a payload. Its `actions` and `rulePolicy` are carried through to
    /// [`DecisionGrid::to_payload`] unchanged.
    pub fn with_payload(mut self, payload: RulePayload) -> Self {
        self.actions = payload.actions;
        self.rule_policy = payload.rule_policy;
        self.with_rows(payload.rules)
    }

    pub fn with_decision_id(mut self, decision_id: impl Into<String>) -> Self {
        self.decision_id = Some(decision_id.into());
        self
    }

    pub fn build(self) -> DecisionGrid {
        let state = match self.rows {
            Some(rows) => hydrate(rows, self.decision_id),
            None => {
                let schema = SchemaRegistry::default();
                let rows = if self.config.seed_default_row {
                    rows::add_row(&schema, &[], self.decision_id.as_deref())
                } else {
                    Vec::new()
                };
                GridSnapshot {
                    schema,
                    rows,
                    cache: PendingInputCache::new(),
                    decision_id: self.decision_id,
                }
            }
        };

        DecisionGrid {
            history: History::new(self.config.history_limit),
            config: self.config,
            state,
            operators: AHashMap::new(),
            actions: self.actions,
            rule_policy: self.rule_policy,
        }
    }
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds schema and rows from persisted rows. A decision id given explicitly wins over
/// the one found on the rows, and is stamped on every row.
fn hydrate(rows: Vec<RuleRow>, decision_id: Option<String>) -> GridSnapshot {
    let decision_id = decision_id.or_else(|| rows.iter().find_map(|r| r.decision_id.clone()));
    let schema = SchemaRegistry::derive_from_rows(&rows);
    let (mut rows, repairs) = rows::conform(&schema, rows);
    if repairs > 0 {
        tracing::warn!(repairs, "hydrated rows did not match the derived schema");
    }
    if let Some(id) = &decision_id {
        rows = rows::set_decision_id(&rows, id);
    }
    tracing::info!(
        rows = rows.len(),
        columns = schema.len(),
        "hydrated decision grid"
    );

    GridSnapshot {
        schema,
        rows,
        cache: PendingInputCache::new(),
        decision_id,
    }
}
