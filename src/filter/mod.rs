//! Filter Module
//!
//! Predicate trees evaluated by storage, with late-bound placeholders.

pub mod compare;
pub mod tuple_filter;

// Re-export key types
pub use self::compare::{CompareOp, CompareTupleFilter, Operand};
pub use self::tuple_filter::{LogicalOp, TupleFilter};
