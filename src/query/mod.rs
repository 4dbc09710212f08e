// Query Context Module
//
// This module contains the per-query requirement aggregator and everything
// built around it: digest construction, model fixing, the per-worker context
// registry and runtime variable binding.

pub mod error;
pub mod scan;
pub mod context;
pub mod digest;
pub mod registry;
pub mod binder;
pub mod tuple_info;
pub mod storage;
pub mod auth;
pub mod realization;
pub mod access;

// Export key public interfaces
pub use self::context::QueryContext;
pub use self::digest::{SortOrder, SqlDigest};
pub use self::error::{ContextError, Result};
pub use self::registry::CompilationPass;
pub use self::binder::VariableSource;
pub use self::access::{AccessControl, AccessController};
pub use self::realization::{Realization, RealizationType};
