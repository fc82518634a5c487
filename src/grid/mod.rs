//! The decision grid: schema, rows, and pending input edited as one unit.
//!
//! Every edit runs against a copy of the current [`GridSnapshot`]. The copy replaces the
//! current state only when the whole edit succeeds, so a rejected edit leaves schema, rows
//! and cache exactly as they were. Replaced snapshots go to the undo history.
use crate::cache::{CacheKey, CellAddress, KeySuffix, PendingInputCache};
use crate::catalog::{AttributeCatalog, OperatorCatalog, OperatorInfo};
use crate::convert::{RawInput, ResultInput};
use crate::error::{GridError, LookupError, PersistenceError, ValidationIssue};
use crate::model::{
    Binding, ColumnDefinition, ColumnId, ColumnKind, DataType, GroupOperator, Operator,
    ResultField, RuleNode, RuleRow,
};
use crate::persistence::{RulePayload, RuleStore, SaveRequest, SaveResponse};
use crate::rows::{self, ResultConfig};
use crate::schema::SchemaRegistry;
use ahash::AHashMap;
use tracing::{debug, info, warn};

mod builder;
mod command;
mod history;
mod validate;

pub use builder::{GridBuilder, GridConfig};
pub use command::EditCommand;
use history::History;

/// Everything an edit changes, captured together.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSnapshot {
    pub schema: SchemaRegistry,
    pub rows: Vec<RuleRow>,
    pub cache: PendingInputCache,
    pub decision_id: Option<String>,
}

impl GridSnapshot {
    /// Checks the structural invariants: rows mirror the schema's condition columns and
    /// group templates, carry exactly the schema's result keys, and are numbered 1..=n.
    pub fn is_consistent(&self) -> bool {
        let conditions = &self.schema.columns()[..self.schema.condition_count()];
        let results_trail = self.schema.columns()[conditions.len()..]
            .iter()
            .all(ColumnDefinition::is_result);

        results_trail
            && self.rows.iter().enumerate().all(|(i, row)| {
                row.priority as usize == i + 1
                    && row.condition_group.rules.len() == conditions.len()
                    && row.result.len() == self.schema.result_fields().count()
                    && self
                        .schema
                        .result_fields()
                        .all(|f| row.result.contains_key(&f.key))
                    && conditions
                        .iter()
                        .zip(&row.condition_group.rules)
                        .all(|(column, node)| match (&column.kind, node) {
                            (ColumnKind::Condition(_), RuleNode::Leaf(_)) => true,
                            (ColumnKind::Group { slots, .. }, RuleNode::Group(group)) => {
                                group.rules.len() == slots.len()
                            }
                            _ => false,
                        })
            })
    }
}

/// Outcome of a successful edit: non-fatal issues the caller may want to show.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditReport {
    pub issues: Vec<ValidationIssue>,
}

impl EditReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

pub struct DecisionGrid {
    config: GridConfig,
    state: GridSnapshot,
    history: History,
    /// Most recently fetched operator list per data type.
    operators: AHashMap<DataType, Vec<OperatorInfo>>,
    /// Payload sections the grid does not edit, written back as loaded.
    actions: Vec<serde_json::Value>,
    rule_policy: Option<serde_json::Value>,
}

impl Default for DecisionGrid {
    fn default() -> Self {
        GridBuilder::new().build()
    }
}

impl DecisionGrid {
    pub fn builder() -> GridBuilder {
        GridBuilder::new()
    }

    pub fn from_payload(payload: RulePayload) -> Self {
        GridBuilder::new().with_payload(payload).build()
    }

    /// Loads a decision table from `store` and hydrates a grid from it.
    pub fn load<S: RuleStore + ?Sized>(
        store: &S,
        decision_id: &str,
        config: GridConfig,
    ) -> Result<Self, PersistenceError> {
        let payload = store.load(decision_id)?;
        info!(decision_id, rules = payload.rules.len(), "loaded rule payload");
        Ok(GridBuilder::new()
            .with_config(config)
            .with_decision_id(decision_id)
            .with_payload(payload)
            .build())
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.state.schema
    }

    pub fn rows(&self) -> &[RuleRow] {
        &self.state.rows
    }

    pub fn cache(&self) -> &PendingInputCache {
        &self.state.cache
    }

    pub fn decision_id(&self) -> Option<&str> {
        self.state.decision_id.as_deref()
    }

    /// A copy of the current state; later edits never affect it.
    pub fn snapshot(&self) -> GridSnapshot {
        self.state.clone()
    }

    pub fn pending(&self, key: &CacheKey) -> Option<&str> {
        self.state.cache.get(key)
    }

    fn edit<T>(
        &mut self,
        label: &'static str,
        f: impl FnOnce(&mut GridSnapshot) -> Result<T, GridError>,
    ) -> Result<T, GridError> {
        let mut next = self.state.clone();
        match f(&mut next) {
            Ok(value) => {
                debug_assert!(next.is_consistent(), "edit '{}' broke grid invariants", label);
                let previous = std::mem::replace(&mut self.state, next);
                self.history.record(previous);
                debug!(edit = label, rows = self.state.rows.len(), "applied edit");
                Ok(value)
            }
            Err(err) => {
                warn!(edit = label, error = %err, "rejected edit");
                Err(err)
            }
        }
    }

    // --- Rows ---

    pub fn add_row(&mut self) -> Result<(), GridError> {
        self.edit("add_row", |state| {
            state.rows = rows::add_row(&state.schema, &state.rows, state.decision_id.as_deref());
            Ok(())
        })
    }

    pub fn insert_row_above(&mut self, index: usize) -> Result<(), GridError> {
        self.edit("insert_row_above", |state| insert_row_at(state, index))
    }

    pub fn insert_row_below(&mut self, index: usize) -> Result<(), GridError> {
        self.edit("insert_row_below", |state| {
            if index >= state.rows.len() {
                return Err(GridError::RowOutOfRange {
                    index,
                    len: state.rows.len(),
                });
            }
            insert_row_at(state, index + 1)
        })
    }

    /// Duplicates a row below itself. In-progress composite input of the source row
    /// (ranges and lists) is copied to the duplicate.
    pub fn duplicate_row(&mut self, index: usize) -> Result<(), GridError> {
        self.edit("duplicate_row", |state| {
            state.rows = rows::duplicate_row(&state.rows, index)?;
            state.cache.shift_rows_from(index + 1, 1);
            let source = &state.rows[index];
            state.cache.copy_row(index, index + 1, |key| {
                let CellAddress::Condition { column, inner, .. } = key.address else {
                    return false;
                };
                key.suffix.is_some()
                    || source
                        .leaf(column, inner)
                        .is_some_and(|leaf| leaf.operator.is_composite())
            });
            Ok(())
        })
    }

    pub fn delete_row(&mut self, index: usize) -> Result<(), GridError> {
        self.edit("delete_row", |state| {
            state.rows = rows::delete_row(&state.rows, index)?;
            state.cache.remove_row(index);
            Ok(())
        })
    }

    /// Moves a row to a new position, which changes its priority.
    pub fn move_row(&mut self, from: usize, to: usize) -> Result<(), GridError> {
        self.edit("move_row", |state| {
            state.rows = rows::move_row(&state.rows, from, to)?;
            state.cache.move_row(from, to);
            Ok(())
        })
    }

    pub fn toggle_enabled(&mut self, index: usize) -> Result<(), GridError> {
        self.edit("toggle_enabled", |state| {
            state.rows = rows::toggle_enabled(&state.rows, index)?;
            Ok(())
        })
    }

    pub fn set_decision_id(&mut self, decision_id: &str) -> Result<(), GridError> {
        self.edit("set_decision_id", |state| {
            state.rows = rows::set_decision_id(&state.rows, decision_id);
            state.decision_id = Some(decision_id.to_string());
            Ok(())
        })
    }

    // --- Columns ---

    /// Inserts a column and the matching node (or result key) into every row.
    pub fn insert_column(&mut self, index: usize, kind: ColumnKind) -> Result<ColumnId, GridError> {
        self.edit("insert_column", |state| {
            let id = state.schema.insert_column(index, kind.clone())?;
            state.rows = rows::insert_column_nodes(&state.rows, index, &kind);
            if !kind.is_result() {
                state.cache.reindex_on_column_shift(|c| c >= index, 1);
            }
            Ok(id)
        })
    }

    /// Appends a condition column after the existing condition columns.
    pub fn add_condition_column(&mut self) -> Result<ColumnId, GridError> {
        let at = self.state.schema.condition_count();
        self.insert_column(at, ColumnKind::Condition(Binding::default()))
    }

    /// Appends a group column with one unbound slot after the existing condition columns.
    pub fn add_group_column(&mut self) -> Result<ColumnId, GridError> {
        let at = self.state.schema.condition_count();
        self.insert_column(at, ColumnKind::empty_group())
    }

    pub fn add_result_column(&mut self, field: ResultField) -> Result<ColumnId, GridError> {
        let at = self.state.schema.len();
        self.insert_column(at, ColumnKind::Result(field))
    }

    /// Removes a column and its node (or result key) from every row.
    pub fn remove_column(&mut self, index: usize) -> Result<ColumnDefinition, GridError> {
        self.edit("remove_column", |state| {
            let removed = state.schema.remove_column(index)?;
            state.rows = rows::remove_column_nodes(&state.rows, index, &removed.kind);
            match &removed.kind {
                ColumnKind::Result(field) => state.cache.purge_result_key(&field.key),
                _ => {
                    state.cache.purge_column(index, None);
                    state.cache.reindex_on_column_shift(|c| c > index, -1);
                }
            }
            Ok(removed)
        })
    }

    /// Binds a condition column to `property`, resolved through the attribute catalog.
    /// Every row's leaf is rebound and cleared. An unknown property or a failing catalog
    /// leaves the type information unset and is reported in the returned issues.
    pub fn set_column_property<C: AttributeCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        column: usize,
        property: &str,
    ) -> Result<EditReport, GridError> {
        let mut report = EditReport::default();
        let binding = resolve_binding(catalog, property, &mut report);
        self.edit("set_column_property", |state| {
            state.rows = rows::rebind_column(&mut state.schema, &state.rows, column, &binding)?;
            state.cache.purge_column(column, None);
            Ok(report)
        })
    }

    /// Column-wide: binds slot `inner` of a group column in every row.
    pub fn set_group_inner_property<C: AttributeCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        column: usize,
        inner: usize,
        property: &str,
    ) -> Result<EditReport, GridError> {
        let mut report = EditReport::default();
        let binding = resolve_binding(catalog, property, &mut report);
        self.edit("set_group_inner_property", |state| {
            state.rows =
                rows::rebind_group_slot(&mut state.schema, &state.rows, column, inner, &binding)?;
            state.cache.purge_column(column, Some(inner));
            Ok(report)
        })
    }

    pub fn add_group_inner_slot(&mut self, column: usize) -> Result<(), GridError> {
        self.edit("add_group_inner_slot", |state| {
            state.rows = rows::add_group_slot(&mut state.schema, &state.rows, column)?;
            Ok(())
        })
    }

    /// Removes a slot from a group column in every row. The last slot cannot be removed.
    pub fn remove_group_inner_slot(
        &mut self,
        column: usize,
        inner: usize,
    ) -> Result<(), GridError> {
        self.edit("remove_group_inner_slot", |state| {
            state.rows = rows::remove_group_slot(&mut state.schema, &state.rows, column, inner)?;
            state.cache.purge_column(column, Some(inner));
            state.cache.reindex_on_slot_shift(column, |i| i > inner, -1);
            Ok(())
        })
    }

    pub fn update_group_operator(
        &mut self,
        column: usize,
        operator: GroupOperator,
    ) -> Result<(), GridError> {
        self.edit("update_group_operator", |state| {
            state.rows =
                rows::update_group_operator(&mut state.schema, &state.rows, column, operator)?;
            Ok(())
        })
    }

    /// Sets the outer AND/OR, which every row shares.
    pub fn update_shared_operator(&mut self, operator: GroupOperator) -> Result<(), GridError> {
        self.edit("update_shared_operator", |state| {
            state.rows = rows::update_shared_operator(&mut state.schema, &state.rows, operator);
            Ok(())
        })
    }

    /// Renames, relabels, or retypes a result column.
    pub fn configure_result_column(
        &mut self,
        column: usize,
        config: &ResultConfig,
    ) -> Result<(), GridError> {
        self.edit("configure_result_column", |state| {
            let (next, previous) =
                rows::configure_result(&mut state.schema, &state.rows, column, config)?;
            state.rows = next;
            if previous.key != config.key {
                state.cache.rename_result_key(&previous.key, &config.key);
            }
            Ok(())
        })
    }

    // --- Cells ---

    /// Converts and stores a condition value; the raw form stays in the pending cache.
    pub fn set_cell_value(
        &mut self,
        row: usize,
        column: usize,
        inner: usize,
        raw: impl Into<RawInput>,
    ) -> Result<(), GridError> {
        let raw = raw.into();
        self.edit("set_cell_value", |state| {
            state.rows =
                rows::set_cell_value(&state.schema, &state.rows, row, column, inner, &raw)?;
            let key = CacheKey::condition(row, column, inner);
            if let RawInput::Range { min, max } = &raw {
                state.cache.set(key.clone().with_suffix(KeySuffix::Min), min.clone());
                state.cache.set(key.clone().with_suffix(KeySuffix::Max), max.clone());
            }
            state.cache.set(key, raw.to_display());
            Ok(())
        })
    }

    /// Sets a cell's operator, resetting its value to the operator's empty shape and
    /// discarding any pending input for the cell.
    pub fn set_cell_operator(
        &mut self,
        row: usize,
        column: usize,
        operator: impl Into<Operator>,
        inner: usize,
    ) -> Result<(), GridError> {
        let operator = operator.into();
        let data_type = self.state.schema.data_type(column, inner)?;
        self.check_operator(&operator, data_type)?;
        self.edit("set_cell_operator", |state| {
            state.rows =
                rows::set_cell_operator(&state.schema, &state.rows, row, column, inner, &operator)?;
            state.cache.purge_cell(row, column, inner);
            Ok(())
        })
    }

    pub fn set_group_inner_operator(
        &mut self,
        row: usize,
        column: usize,
        inner: usize,
        operator: impl Into<Operator>,
    ) -> Result<(), GridError> {
        self.require_group(column)?;
        self.set_cell_operator(row, column, operator, inner)
    }

    pub fn set_group_inner_value(
        &mut self,
        row: usize,
        column: usize,
        inner: usize,
        raw: impl Into<RawInput>,
    ) -> Result<(), GridError> {
        self.require_group(column)?;
        self.set_cell_value(row, column, inner, raw)
    }

    /// Stores a result value: attribute bindings verbatim, raw input converted.
    pub fn set_result_value(
        &mut self,
        row: usize,
        key: &str,
        input: impl Into<ResultInput>,
    ) -> Result<(), GridError> {
        let input = input.into();
        self.edit("set_result_value", |state| {
            state.rows = rows::set_result_value(&state.schema, &state.rows, row, key, &input)?;
            let cache_key = CacheKey::result(row, key);
            match &input {
                ResultInput::Raw(raw) => state.cache.set(cache_key, raw.to_display()),
                ResultInput::Attribute(_) => {
                    state.cache.delete(&cache_key);
                }
            }
            Ok(())
        })
    }

    /// Buffers in-progress input without touching the rows. The key must name an
    /// existing row and an existing condition cell or result column.
    pub fn stage_input(&mut self, key: CacheKey, raw: impl Into<String>) -> Result<(), GridError> {
        if key.row() >= self.state.rows.len() {
            return Err(GridError::RowOutOfRange {
                index: key.row(),
                len: self.state.rows.len(),
            });
        }
        match &key.address {
            CellAddress::Condition { column, inner, .. } => {
                self.state.schema.binding(*column, *inner)?;
            }
            CellAddress::Result { key: result_key, .. } => {
                if self.state.schema.result_column(result_key).is_none() {
                    return Err(GridError::UnknownResultKey(result_key.clone()));
                }
            }
        }
        self.state.cache.set(key, raw);
        Ok(())
    }

    /// Commits the buffered input of one condition cell. `-min`/`-max` entries take
    /// precedence, then `-list`, then the plain entry. Returns `false` if nothing was
    /// buffered.
    pub fn commit_cell(
        &mut self,
        row: usize,
        column: usize,
        inner: usize,
    ) -> Result<bool, GridError> {
        let base = CacheKey::condition(row, column, inner);
        let cache = &self.state.cache;
        let min = cache.get(&base.clone().with_suffix(KeySuffix::Min));
        let max = cache.get(&base.clone().with_suffix(KeySuffix::Max));
        let raw = if min.is_some() || max.is_some() {
            RawInput::Range {
                min: min.unwrap_or_default().to_string(),
                max: max.unwrap_or_default().to_string(),
            }
        } else if let Some(list) = cache.get(&base.clone().with_suffix(KeySuffix::List)) {
            RawInput::text(list)
        } else if let Some(text) = cache.get(&base) {
            RawInput::text(text)
        } else {
            return Ok(false);
        };
        self.set_cell_value(row, column, inner, raw)?;
        Ok(true)
    }

    // --- Operators ---

    /// Fetches and remembers the operators offered for `data_type`.
    pub fn fetch_operators<C: OperatorCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        data_type: DataType,
    ) -> Result<Vec<OperatorInfo>, LookupError> {
        match catalog.operators(data_type) {
            Ok(operators) => {
                self.operators.insert(data_type, operators.clone());
                Ok(operators)
            }
            Err(err) => {
                warn!(%data_type, error = %err, "operator lookup failed");
                Err(err)
            }
        }
    }

    pub fn remember_operators(&mut self, data_type: DataType, operators: Vec<OperatorInfo>) {
        self.operators.insert(data_type, operators);
    }

    fn check_operator(
        &self,
        operator: &Operator,
        data_type: Option<DataType>,
    ) -> Result<(), GridError> {
        if !self.config.strict_operators || operator.is_unset() {
            return Ok(());
        }
        let Some(data_type) = data_type else {
            return Ok(());
        };
        match self.operators.get(&data_type) {
            Some(known) if !known.iter().any(|o| o.key == operator.key()) => {
                Err(GridError::IllegalOperator {
                    operator: operator.key().to_string(),
                    data_type,
                })
            }
            _ => Ok(()),
        }
    }

    fn require_group(&self, column: usize) -> Result<(), GridError> {
        match &self.state.schema.column(column)?.kind {
            ColumnKind::Group { .. } => Ok(()),
            other => Err(GridError::KindMismatch {
                column,
                expected: "group",
                found: other.name(),
            }),
        }
    }

    // --- Validation, history, persistence ---

    /// Problems that should block a save or test run.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate::validate(&self.state)
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.state) {
            Some(previous) => {
                self.state = previous;
                debug!("undo");
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.state) {
            Some(next) => {
                self.state = next;
                debug!("redo");
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// The current rows, with the `actions` and `rulePolicy` the grid was loaded with.
    pub fn to_payload(&self) -> RulePayload {
        RulePayload {
            rules: self.state.rows.clone(),
            actions: self.actions.clone(),
            rule_policy: self.rule_policy.clone(),
        }
    }

    pub fn save_request(
        &self,
        workspace_id: Option<&str>,
    ) -> Result<SaveRequest, PersistenceError> {
        let decision_id = self.state.decision_id.clone().ok_or_else(|| {
            PersistenceError::Rejected("the grid has no decision id yet".to_string())
        })?;
        Ok(SaveRequest {
            decision_id,
            workspace_id: workspace_id.map(str::to_string),
            rules: self.state.rows.clone(),
        })
    }

    pub fn save<S: RuleStore + ?Sized>(
        &self,
        store: &S,
        workspace_id: Option<&str>,
    ) -> Result<SaveResponse, PersistenceError> {
        let request = self.save_request(workspace_id)?;
        let response = store.save(&request)?;
        if response.success {
            info!(decision_id = %request.decision_id, rules = request.rules.len(), "saved rules");
        } else {
            warn!(decision_id = %request.decision_id, message = %response.message, "save failed");
        }
        Ok(response)
    }
}

fn insert_row_at(state: &mut GridSnapshot, at: usize) -> Result<(), GridError> {
    state.rows = rows::insert_row(&state.schema, &state.rows, at, state.decision_id.as_deref())?;
    state.cache.shift_rows_from(at, 1);
    Ok(())
}

fn resolve_binding<C: AttributeCatalog + ?Sized>(
    catalog: &C,
    property: &str,
    report: &mut EditReport,
) -> Binding {
    if property.trim().is_empty() {
        return Binding::default();
    }
    match catalog.attributes() {
        Ok(groups) => groups.resolve(property).unwrap_or_else(|| {
            report.issues.push(ValidationIssue::UnresolvedAttribute {
                property: property.to_string(),
            });
            Binding::unresolved(property)
        }),
        Err(err) => {
            warn!(property, error = %err, "attribute lookup failed");
            report.issues.push(ValidationIssue::LookupFailed(err));
            Binding::unresolved(property)
        }
    }
}
