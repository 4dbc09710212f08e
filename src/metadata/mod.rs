//! Metadata Module
//!
//! Column references, data models and measure descriptors shared by query
//! contexts, filters and digests.

pub mod types;
pub mod column;
pub mod model;
pub mod measure;

// Re-export key types
pub use self::types::DataType;
pub use self::column::{ColumnDesc, TableDesc, TblColRef};
pub use self::model::{DataModelDesc, JoinDesc, JoinType, JoinsTree, TableRef};
pub use self::measure::{FunctionDesc, FunctionExpr, MeasureDesc, SqlCall, SqlCallArg};
