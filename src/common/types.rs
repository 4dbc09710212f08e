use std::sync::Arc;
use parking_lot::RwLock;

use crate::query::context::QueryContext;

/// Query context ID type, unique within one compilation pass
pub type ContextId = u32;

/// Shared handle to a query context.
///
/// Mutated only by the compilation pass that created it; execution threads
/// take read locks once compilation is done.
pub type ContextRef = Arc<RwLock<QueryContext>>;

/// Wrap a context in a shared handle
pub fn context_ref(ctx: QueryContext) -> ContextRef {
    Arc::new(RwLock::new(ctx))
}
