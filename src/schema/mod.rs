//! The schema registry: the ordered column definitions shared by every row.
//!
//! Condition and group columns always precede result columns, so the schema index of a
//! condition column is also its index in each row's outer `rules` array.
use crate::error::GridError;
use crate::model::{
    Binding, ColumnDefinition, ColumnId, ColumnKind, DataType, GroupOperator, ResultField,
    ResultValue, RuleNode, RuleRow, Scalar,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRegistry {
    columns: Vec<ColumnDefinition>,
    outer_operator: GroupOperator,
    next_id: u64,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        let mut schema = Self {
            columns: Vec::new(),
            outer_operator: GroupOperator::All,
            next_id: 0,
        };
        schema.push(ColumnKind::Condition(Binding::default()));
        schema
    }
}

impl SchemaRegistry {
    /// Derives the column list from an existing set of rows.
    ///
    /// The first row's outer rules define the condition and group columns; when there is no
    /// such row, or it has no rules, a single unbound condition column is used. One result
    /// column follows per distinct result key across all rows, typed after the first
    /// non-empty literal found for that key.
    pub fn derive_from_rows(rows: &[RuleRow]) -> Self {
        let mut schema = Self {
            columns: Vec::new(),
            outer_operator: GroupOperator::All,
            next_id: 0,
        };

        match rows.first() {
            Some(first) if !first.condition_group.rules.is_empty() => {
                schema.outer_operator = first.condition_group.operator;
                for node in &first.condition_group.rules {
                    let kind = match node {
                        RuleNode::Leaf(leaf) => ColumnKind::Condition(leaf.binding()),
                        RuleNode::Group(group) => {
                            let mut slots: Vec<Binding> =
                                group.rules.iter().map(|leaf| leaf.binding()).collect();
                            if slots.is_empty() {
                                slots.push(Binding::default());
                            }
                            ColumnKind::Group {
                                operator: group.operator,
                                slots,
                            }
                        }
                    };
                    schema.push(kind);
                }
            }
            Some(first) => {
                schema.outer_operator = first.condition_group.operator;
                schema.push(ColumnKind::Condition(Binding::default()));
            }
            None => schema.push(ColumnKind::Condition(Binding::default())),
        }

        let mut seen: Vec<&str> = Vec::new();
        for row in rows {
            for key in row.result.keys() {
                if !seen.contains(&key.as_str()) {
                    seen.push(key);
                }
            }
        }
        for key in seen {
            let field = ResultField {
                key: key.to_string(),
                display_name: key.to_string(),
                data_type: Some(infer_result_type(rows, key)),
                is_from_external_source: true,
            };
            schema.push(ColumnKind::Result(field));
        }

        schema
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(index)
    }

    pub fn outer_operator(&self) -> GroupOperator {
        self.outer_operator
    }

    pub fn set_outer_operator(&mut self, operator: GroupOperator) {
        self.outer_operator = operator;
    }

    /// Number of condition and group columns (they come first).
    pub fn condition_count(&self) -> usize {
        self.columns.iter().take_while(|c| !c.is_result()).count()
    }

    pub fn result_fields(&self) -> impl Iterator<Item = &ResultField> {
        self.columns.iter().filter_map(ColumnDefinition::result_field)
    }

    /// Position and definition of the result column with `key`.
    pub fn result_column(&self, key: &str) -> Option<(usize, &ResultField)> {
        self.columns
            .iter()
            .enumerate()
            .find_map(|(i, c)| c.result_field().filter(|f| f.key == key).map(|f| (i, f)))
    }

    pub fn column(&self, index: usize) -> Result<&ColumnDefinition, GridError> {
        self.columns.get(index).ok_or(GridError::ColumnOutOfRange {
            index,
            len: self.columns.len(),
        })
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> Result<&mut ColumnDefinition, GridError> {
        let len = self.columns.len();
        self.columns
            .get_mut(index)
            .ok_or(GridError::ColumnOutOfRange { index, len })
    }

    /// The binding that governs one condition cell: the column's own binding, or the
    /// group template slot `inner`.
    pub fn binding(&self, column: usize, inner: usize) -> Result<&Binding, GridError> {
        match &self.column(column)?.kind {
            ColumnKind::Condition(binding) if inner == 0 => Ok(binding),
            ColumnKind::Condition(_) => Err(GridError::InnerRuleOutOfRange {
                column,
                inner,
                len: 1,
            }),
            ColumnKind::Group { slots, .. } => {
                slots.get(inner).ok_or(GridError::InnerRuleOutOfRange {
                    column,
                    inner,
                    len: slots.len(),
                })
            }
            ColumnKind::Result(_) => Err(GridError::KindMismatch {
                column,
                expected: "condition",
                found: "result",
            }),
        }
    }

    pub fn data_type(&self, column: usize, inner: usize) -> Result<Option<DataType>, GridError> {
        Ok(self.binding(column, inner)?.data_type)
    }

    /// Inserts a column at `index` and returns its new id.
    ///
    /// The caller must insert the matching node into every row in the same edit.
    pub fn insert_column(&mut self, index: usize, kind: ColumnKind) -> Result<ColumnId, GridError> {
        let boundary = self.condition_count();
        let allowed = if kind.is_result() {
            (boundary..=self.columns.len()).contains(&index)
        } else {
            index <= boundary
        };
        if !allowed {
            return Err(GridError::Misplaced {
                kind: kind.name(),
                index,
                boundary,
            });
        }
        if let ColumnKind::Result(field) = &kind {
            self.check_result_key(&field.key, None)?;
        }
        if let ColumnKind::Group { slots, .. } = &kind {
            if slots.is_empty() {
                return Err(GridError::LastInnerRule { column: index });
            }
        }

        let id = self.allocate_id();
        self.columns.insert(index, ColumnDefinition { id, kind });
        Ok(id)
    }

    /// Removes the column at `index`.
    ///
    /// The caller must strip the matching rule node or result key from every row.
    pub fn remove_column(&mut self, index: usize) -> Result<ColumnDefinition, GridError> {
        let column = self.column(index)?;
        if !column.is_result() && self.condition_count() <= 1 {
            return Err(GridError::LastColumn);
        }
        Ok(self.columns.remove(index))
    }

    /// Sets the combinator of a group column. Applies to every row.
    pub fn update_group_operator(
        &mut self,
        index: usize,
        operator: GroupOperator,
    ) -> Result<(), GridError> {
        match &mut self.column_mut(index)?.kind {
            ColumnKind::Group { operator: op, .. } => {
                *op = operator;
                Ok(())
            }
            other => Err(GridError::KindMismatch {
                column: index,
                expected: "group",
                found: other.name(),
            }),
        }
    }

    /// Ensures `key` is usable as a result key, ignoring the column at `except`.
    pub(crate) fn check_result_key(
        &self,
        key: &str,
        except: Option<usize>,
    ) -> Result<(), GridError> {
        if key.trim().is_empty() {
            return Err(GridError::EmptyResultKey);
        }
        let taken = self.columns.iter().enumerate().any(|(i, c)| {
            Some(i) != except && c.result_field().is_some_and(|f| f.key == key)
        });
        if taken {
            return Err(GridError::DuplicateResultKey(key.to_string()));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> ColumnId {
        let id = ColumnId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, kind: ColumnKind) {
        let id = self.allocate_id();
        self.columns.push(ColumnDefinition { id, kind });
    }
}

fn infer_result_type(rows: &[RuleRow], key: &str) -> DataType {
    rows.iter()
        .filter_map(|row| match row.result.get(key)? {
            ResultValue::Literal(Scalar::Number(_)) => Some(DataType::Numeric),
            ResultValue::Literal(Scalar::Bool(_)) => Some(DataType::Boolean),
            ResultValue::Literal(Scalar::Text(text)) if !text.is_empty() => Some(DataType::String),
            ResultValue::Literal(Scalar::Text(_)) | ResultValue::Attribute(_) => None,
        })
        .next()
        .unwrap_or(DataType::String)
}
