// Storage Context
//
// Per-context execution hints handed to the storage engine with the digest.

use serde::{Serialize, Deserialize};

use crate::common::types::ContextId;

/// Scoped execution hints for one query context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageContext {
    context_id: ContextId,
    /// Storage may stop early and return what it has
    accept_partial_result: bool,
    /// Set by storage when it did stop early
    partial_result_returned: bool,
    limit: Option<usize>,
    offset: usize,
    /// Post-aggregation above storage is unnecessary
    exact_aggregation: bool,
    need_storage_aggregation: bool,
}

impl StorageContext {
    pub fn new(context_id: ContextId) -> Self {
        StorageContext {
            context_id,
            accept_partial_result: false,
            partial_result_returned: false,
            limit: None,
            offset: 0,
            exact_aggregation: false,
            need_storage_aggregation: true,
        }
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn accept_partial_result(&self) -> bool {
        self.accept_partial_result
    }

    pub fn set_accept_partial_result(&mut self, accept: bool) {
        self.accept_partial_result = accept;
    }

    pub fn partial_result_returned(&self) -> bool {
        self.partial_result_returned
    }

    pub fn set_partial_result_returned(&mut self, returned: bool) {
        self.partial_result_returned = returned;
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_limit(&mut self, limit: usize, offset: usize) {
        self.limit = Some(limit);
        self.offset = offset;
    }

    /// Rows storage must produce to satisfy limit and offset
    pub fn final_push_down_limit(&self) -> Option<usize> {
        self.limit.map(|l| l.saturating_add(self.offset))
    }

    pub fn is_exact_aggregation(&self) -> bool {
        self.exact_aggregation
    }

    pub fn set_exact_aggregation(&mut self, exact: bool) {
        self.exact_aggregation = exact;
    }

    pub fn need_storage_aggregation(&self) -> bool {
        self.need_storage_aggregation
    }

    pub fn set_need_storage_aggregation(&mut self, need: bool) {
        self.need_storage_aggregation = need;
    }
}
