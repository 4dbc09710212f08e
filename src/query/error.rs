// Query Context Errors
//
// Error types raised by context construction, digest building, model fixing,
// variable binding and access control.

use thiserror::Error;

use crate::common::date_format::DateFormatError;
use crate::common::types::ContextId;

/// Error type for query context operations
#[derive(Error, Debug)]
pub enum ContextError {
    /// Digest requested before the primary scan was determined
    #[error("context {0} has no fact table scan; digest cannot be built")]
    MissingFactTable(ContextId),

    #[error("cannot fix context {context} to model '{model}': {reason}")]
    ModelFix {
        context: ContextId,
        model: String,
        reason: String,
    },

    /// Same alias registered again over a different table
    #[error("context {context} already scans '{alias}' as {existing}, cannot scan it as {requested}")]
    ScanConflict {
        context: ContextId,
        alias: String,
        existing: String,
        requested: String,
    },

    #[error("invalid temporal value for variable '{variable}': {source}")]
    InvalidTemporal {
        variable: String,
        #[source]
        source: DateFormatError,
    },

    #[error("query rejected by access control: {0}")]
    AccessDenied(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for query context operations
pub type Result<T> = std::result::Result<T, ContextError>;
