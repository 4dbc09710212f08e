// Context Registry
//
// Per-worker storage for the two pieces of state that live for exactly one
// compilation pass: the ambient pass parameters and the id -> context map.
// Both are thread-local; compilations on other worker threads never see them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use log::debug;

use crate::common::types::{context_ref, ContextId, ContextRef};
use super::context::QueryContext;

/// Pass parameter: storage may return a partial result
pub const PRM_ACCEPT_PARTIAL_RESULT: &str = "AcceptPartialResult";
/// Pass parameter: authenticated user blob
pub const PRM_USER_AUTHEN_INFO: &str = "UserAuthenInfo";

thread_local! {
    static PARAMETERS: RefCell<Option<HashMap<String, String>>> = const { RefCell::new(None) };
    static CONTEXTS: RefCell<Option<HashMap<ContextId, ContextRef>>> = const { RefCell::new(None) };
    static PASS_ACTIVE: Cell<bool> = const { Cell::new(false) };
}

/// Set the parameters contexts created on this worker will read. Must be
/// paired with `clear_parameters` when the pass ends.
pub fn set_parameters(parameters: HashMap<String, String>) {
    PARAMETERS.with(|p| *p.borrow_mut() = Some(parameters));
}

pub fn clear_parameters() {
    PARAMETERS.with(|p| *p.borrow_mut() = None);
}

/// Parameters of the pass running on this worker, if any were set
pub fn current_parameters() -> Option<HashMap<String, String>> {
    PARAMETERS.with(|p| p.borrow().clone())
}

/// Register a context on this worker, replacing any with the same id
pub fn register_context(ctx: ContextRef) {
    let id = ctx.read().id;
    CONTEXTS.with(|c| {
        c.borrow_mut().get_or_insert_with(HashMap::new).insert(id, ctx);
    });
    debug!("registered context {}", id);
}

/// All contexts registered on this worker, ordered by id. None when nothing
/// has been registered since the last clear.
pub fn thread_local_contexts() -> Option<Vec<ContextRef>> {
    CONTEXTS.with(|c| {
        c.borrow().as_ref().map(|map| {
            let mut contexts: Vec<(ContextId, ContextRef)> =
                map.iter().map(|(id, ctx)| (*id, ctx.clone())).collect();
            contexts.sort_by_key(|(id, _)| *id);
            contexts.into_iter().map(|(_, ctx)| ctx).collect()
        })
    })
}

/// Context registered on this worker under `id`
pub fn context_by_id(id: ContextId) -> Option<ContextRef> {
    CONTEXTS.with(|c| c.borrow().as_ref().and_then(|map| map.get(&id).cloned()))
}

/// Forget every context registered on this worker
pub fn clear_contexts() {
    CONTEXTS.with(|c| *c.borrow_mut() = None);
}

/// Scope of one compilation pass on the current worker.
///
/// Sets the pass parameters on creation and hands out contexts with
/// increasing ids, registering each one. Dropping the guard clears the
/// parameters and the registry, including on early return and unwinding.
///
/// Passes do not nest: at most one may be live per worker, since dropping
/// any pass clears the worker's whole registry. Debug builds assert this.
pub struct CompilationPass {
    next_id: ContextId,
}

impl CompilationPass {
    pub fn begin(parameters: HashMap<String, String>) -> Self {
        debug_assert!(
            !PASS_ACTIVE.with(Cell::get),
            "a compilation pass is already active on this thread"
        );
        PASS_ACTIVE.with(|a| a.set(true));
        set_parameters(parameters);
        CompilationPass { next_id: 0 }
    }

    /// Create and register the next context of this pass
    pub fn new_context(&mut self) -> ContextRef {
        let ctx = context_ref(QueryContext::new(self.next_id));
        self.next_id += 1;
        register_context(ctx.clone());
        ctx
    }

    /// Number of contexts created so far
    pub fn context_count(&self) -> usize {
        self.next_id as usize
    }
}

impl Drop for CompilationPass {
    fn drop(&mut self) {
        clear_contexts();
        clear_parameters();
        PASS_ACTIVE.with(|a| a.set(false));
        debug!("compilation pass ended after {} contexts", self.next_id);
    }
}
