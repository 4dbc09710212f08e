// OLAP Query Context Layer

pub mod common;
pub mod config;
pub mod filter;
pub mod metadata;
pub mod query;
pub mod scenario;

// Re-export key items for convenient access
pub use common::types::{ContextId, ContextRef};
pub use config::QueryConfig;
pub use query::context::QueryContext;
pub use query::digest::{SortOrder, SqlDigest};
pub use query::error::ContextError;
pub use query::registry::CompilationPass;
