pub mod column;
pub mod rule;
pub mod value;

pub use column::*;
pub use rule::*;
pub use value::{AttributeReference, CellValue, ResultValue, Scalar};
