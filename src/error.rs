use crate::model::DataType;
use thiserror::Error;

/// Errors that reject a single edit operation. The grid is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Row {index} is out of range for a grid with {len} rows")]
    RowOutOfRange { index: usize, len: usize },

    #[error("Column {index} is out of range for a schema with {len} columns")]
    ColumnOutOfRange { index: usize, len: usize },

    #[error("Inner rule {inner} is out of range for column {column} with {len} slots")]
    InnerRuleOutOfRange {
        column: usize,
        inner: usize,
        len: usize,
    },

    #[error("Column {column} is a {found} column, but this edit requires a {expected} column")]
    KindMismatch {
        column: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "A {kind} column cannot be inserted at index {index}: condition columns end at {boundary}"
    )]
    Misplaced {
        kind: &'static str,
        index: usize,
        boundary: usize,
    },

    #[error("The grid must keep at least one condition column")]
    LastColumn,

    #[error("Group column {column} must keep at least one inner rule")]
    LastInnerRule { column: usize },

    #[error("Result column '{0}' does not exist")]
    UnknownResultKey(String),

    #[error("Result key must not be empty")]
    EmptyResultKey,

    #[error("Result key '{0}' is already used by another column")]
    DuplicateResultKey(String),

    #[error("Result key '{0}' was loaded from a persisted rule and cannot be renamed")]
    ReadOnlyResultKey(String),

    #[error("Operator '{operator}' is not offered for {data_type} values")]
    IllegalOperator {
        operator: String,
        data_type: DataType,
    },

    #[error("Row {row} does not match the column schema at index {column}")]
    SchemaDrift { row: usize, column: usize },
}

/// Errors reported by the external attribute, operator, and data type catalogs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("{service} lookup is unreachable: {message}")]
    Unreachable {
        service: &'static str,
        message: String,
    },

    #[error("{service} lookup failed: {message}")]
    Failed {
        service: &'static str,
        message: String,
    },
}

/// Errors from loading or saving rule payloads.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    #[error("No rule payload stored for decision '{0}'")]
    NotFound(String),

    #[error("Could not read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Could not write '{path}': {message}")]
    Write { path: String, message: String },

    #[error("Malformed rule payload: {0}")]
    Json(String),

    #[error("The rule store rejected the request: {0}")]
    Rejected(String),
}

/// Non-fatal, user-correctable problems. Reported, never thrown; the caller decides
/// whether they block a save.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    #[error("Result column {column} has an empty key")]
    EmptyResultKey { column: usize },

    #[error("Result key '{key}' is used by more than one column")]
    DuplicateResultKey { key: String },

    #[error("Column {column} (slot {inner}) is not bound to an attribute")]
    UnboundColumn { column: usize, inner: usize },

    #[error("Row {row}, column {column} (slot {inner}) has no operator")]
    MissingOperator {
        row: usize,
        column: usize,
        inner: usize,
    },

    #[error("Row {row}, column {column} (slot {inner}) needs a value")]
    EmptyValue {
        row: usize,
        column: usize,
        inner: usize,
    },

    #[error("Row {row}, column {column} (slot {inner}) has an incomplete range")]
    IncompleteRange {
        row: usize,
        column: usize,
        inner: usize,
    },

    #[error("Row {row}, column {column} (slot {inner}) holds '{value}', which is not a number")]
    NotNumeric {
        row: usize,
        column: usize,
        inner: usize,
        value: String,
    },

    #[error("Row {row} belongs to decision '{found}', expected '{expected}'")]
    InconsistentDecisionId {
        row: usize,
        expected: String,
        found: String,
    },

    #[error("Attribute '{property}' was not found in the attribute catalog")]
    UnresolvedAttribute { property: String },

    #[error("Attribute lookup failed: {0}")]
    LookupFailed(LookupError),
}
