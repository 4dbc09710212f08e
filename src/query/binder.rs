// Runtime Variable Binder
//
// Resolves named placeholders in a filter tree against values supplied at
// execution time. Temporal columns receive epoch milliseconds, every other
// column receives the value's text.

use std::collections::HashMap;
use log::debug;

use crate::common::date_format;
use crate::filter::{CompareTupleFilter, TupleFilter};
use super::error::{ContextError, Result};

/// Runtime values looked up by variable name
pub trait VariableSource {
    fn get(&self, name: &str) -> Option<String>;
}

impl VariableSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

impl VariableSource for HashMap<String, serde_json::Value> {
    fn get(&self, name: &str) -> Option<String> {
        match HashMap::get(self, name)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Bind every placeholder of `filter` that `source` has a value for.
/// Children are bound before their parent; names the source does not know
/// are left unbound.
pub fn bind_filter(filter: &mut TupleFilter, source: &dyn VariableSource) -> Result<()> {
    for child in filter.children_mut() {
        bind_filter(child, source)?;
    }

    if let TupleFilter::Compare(compare) = filter {
        bind_compare(compare, source)?;
    }
    Ok(())
}

fn bind_compare(compare: &mut CompareTupleFilter, source: &dyn VariableSource) -> Result<()> {
    let is_temporal = compare.column().data_type().is_datetime_family();

    for variable in compare.variables() {
        let Some(raw) = source.get(&variable) else {
            continue;
        };
        let value = if is_temporal {
            date_format::string_to_millis(&raw)
                .map_err(|source| ContextError::InvalidTemporal {
                    variable: variable.clone(),
                    source,
                })?
                .to_string()
        } else {
            raw
        };
        debug!("binding variable {} on {} to {}", variable, compare.column(), value);
        compare.bind_variable(&variable, value);
    }
    Ok(())
}
