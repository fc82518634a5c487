//! Prelude module for convenient imports
//!
//! Re-exports the types needed to build, edit, validate, and persist a decision grid.
//!
//! # Example
//!
//! ```rust,no_run
//! use rulegrid::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let store = JsonFileStore::new("rules");
//! let mut grid = DecisionGrid::load(&store, "pricing", GridConfig::default())?;
//! grid.add_row()?;
//! grid.toggle_enabled(0)?;
//!
//! if grid.validate().is_empty() {
//!     let response = grid.save(&store, Some("workspace-1"))?;
//!     println!("{}", response.message);
//! }
//! # Ok(())
//! # }
//! ```

// Grid and its configuration
pub use crate::grid::{
    DecisionGrid, EditCommand, EditReport, GridBuilder, GridConfig, GridSnapshot,
};

// Data model
pub use crate::model::{
    AttributeReference, Binding, CellValue, ColumnDefinition, ColumnKind, ConditionLeaf,
    DataType, GroupNode, GroupOperator, Operator, ResultField, ResultValue, RuleNode, RuleRow,
    Scalar, SourceType,
};

// Input, conversion, and pending cache
pub use crate::cache::{CacheKey, CellAddress, KeySuffix, PendingInputCache};
pub use crate::convert::{RawInput, ResultInput};
pub use crate::rows::ResultConfig;
pub use crate::schema::SchemaRegistry;

// External interfaces
pub use crate::catalog::{AttributeCatalog, DataTypeCatalog, OperatorCatalog, StaticCatalog};
pub use crate::persistence::{JsonFileStore, RulePayload, RuleStore};

// Error types
pub use crate::error::{GridError, LookupError, PersistenceError, ValidationIssue};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
