use super::{DecisionGrid, EditReport};
use crate::catalog::AttributeCatalog;
use crate::convert::{RawInput, ResultInput};
use crate::error::GridError;
use crate::model::{ColumnKind, GroupOperator, Operator};
use crate::rows::ResultConfig;
use serde::{Deserialize, Serialize};

/// One edit operation in serializable form, e.g.
/// `{"op": "setCellValue", "row": 0, "column": 1, "value": "10,20"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditCommand {
    AddRow,
    InsertRowAbove {
        index: usize,
    },
    InsertRowBelow {
        index: usize,
    },
    DuplicateRow {
        index: usize,
    },
    DeleteRow {
        index: usize,
    },
    MoveRow {
        from: usize,
        to: usize,
    },
    ToggleEnabled {
        index: usize,
    },
    InsertColumn {
        index: usize,
        column: ColumnKind,
    },
    RemoveColumn {
        index: usize,
    },
    SetCellValue {
        row: usize,
        column: usize,
        #[serde(default)]
        inner: usize,
        value: RawInput,
    },
    SetCellOperator {
        row: usize,
        column: usize,
        #[serde(default)]
        inner: usize,
        operator: Operator,
    },
    SetResultValue {
        row: usize,
        key: String,
        value: ResultInput,
    },
    SetColumnProperty {
        column: usize,
        property: String,
    },
    SetGroupInnerProperty {
        column: usize,
        inner: usize,
        property: String,
    },
    AddGroupInnerSlot {
        column: usize,
    },
    RemoveGroupInnerSlot {
        column: usize,
        inner: usize,
    },
    UpdateGroupOperator {
        column: usize,
        operator: GroupOperator,
    },
    UpdateSharedOperator {
        operator: GroupOperator,
    },
    ConfigureResultColumn {
        column: usize,
        config: ResultConfig,
    },
    SetDecisionId {
        decision_id: String,
    },
}

impl DecisionGrid {
    /// Runs one command. Property lookups go through `catalog`.
    pub fn apply<C: AttributeCatalog + ?Sized>(
        &mut self,
        command: &EditCommand,
        catalog: &C,
    ) -> Result<EditReport, GridError> {
        let done = EditReport::default();
        match command {
            EditCommand::AddRow => self.add_row()?,
            EditCommand::InsertRowAbove { index } => self.insert_row_above(*index)?,
            EditCommand::InsertRowBelow { index } => self.insert_row_below(*index)?,
            EditCommand::DuplicateRow { index } => self.duplicate_row(*index)?,
            EditCommand::DeleteRow { index } => self.delete_row(*index)?,
            EditCommand::MoveRow { from, to } => self.move_row(*from, *to)?,
            EditCommand::ToggleEnabled { index } => self.toggle_enabled(*index)?,
            EditCommand::InsertColumn { index, column } => {
                self.insert_column(*index, column.clone())?;
            }
            EditCommand::RemoveColumn { index } => {
                self.remove_column(*index)?;
            }
            EditCommand::SetCellValue {
                row,
                column,
                inner,
                value,
            } => self.set_cell_value(*row, *column, *inner, value.clone())?,
            EditCommand::SetCellOperator {
                row,
                column,
                inner,
                operator,
            } => self.set_cell_operator(*row, *column, operator.clone(), *inner)?,
            EditCommand::SetResultValue { row, key, value } => {
                self.set_result_value(*row, key, value.clone())?
            }
            EditCommand::SetColumnProperty { column, property } => {
                return self.set_column_property(catalog, *column, property);
            }
            EditCommand::SetGroupInnerProperty {
                column,
                inner,
                property,
            } => return self.set_group_inner_property(catalog, *column, *inner, property),
            EditCommand::AddGroupInnerSlot { column } => self.add_group_inner_slot(*column)?,
            EditCommand::RemoveGroupInnerSlot { column, inner } => {
                self.remove_group_inner_slot(*column, *inner)?
            }
            EditCommand::UpdateGroupOperator { column, operator } => {
                self.update_group_operator(*column, *operator)?
            }
            EditCommand::UpdateSharedOperator { operator } => {
                self.update_shared_operator(*operator)?
            }
            EditCommand::ConfigureResultColumn { column, config } => {
                self.configure_result_column(*column, config)?
            }
            EditCommand::SetDecisionId { decision_id } => self.set_decision_id(decision_id)?,
        }
        Ok(done)
    }
}
