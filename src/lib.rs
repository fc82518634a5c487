//! # rulegrid - Decision Table Editing Model
//!
//! **rulegrid** is the state model behind a spreadsheet-like decision table editor. Each
//! row is a rule, each column is a condition, a group of conditions, or a result field
//! shared by every row. The crate keeps three structures in sync under frequent partial
//! edits:
//!
//! 1.  **Schema registry**: the ordered column definitions, including the shared outer
//!     AND/OR operator and each group column's inner-rule template.
//! 2.  **Rows**: the nested, JSON-shaped rules that are persisted and evaluated elsewhere.
//! 3.  **Pending input cache**: raw, position-keyed editor input (half-typed numbers,
//!     range bounds, lists) that has not been committed yet.
//!
//! Every edit on a [`DecisionGrid`](grid::DecisionGrid) is atomic: it either updates all
//! three together or fails with a [`GridError`](error::GridError) and changes nothing.
//! Attribute, operator, and persistence services are external; the crate only defines
//! the traits it consumes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rulegrid::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let catalog = StaticCatalog::new()
//!         .with_input("age", DataType::Numeric)
//!         .with_global("country", DataType::String);
//!
//!     // An empty grid starts with one unbound condition column and one row.
//!     let mut grid = DecisionGrid::builder().with_decision_id("pricing").build();
//!     grid.set_column_property(&catalog, 0, "age")?;
//!     grid.add_result_column(ResultField::new("discount", Some(DataType::Numeric)))?;
//!
//!     grid.set_cell_operator(0, 0, "between", 0)?;
//!     grid.set_cell_value(0, 0, 0, "18,30")?;
//!     grid.set_result_value(0, "discount", "15")?;
//!
//!     for issue in grid.validate() {
//!         println!("warning: {}", issue);
//!     }
//!     println!("{}", grid.to_payload().to_json()?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod convert;
pub mod error;
pub mod grid;
pub mod model;
pub mod persistence;
pub mod prelude;
pub mod rows;
pub mod schema;
