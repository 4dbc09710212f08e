//! Query Configuration
//!
//! Settings that shape a compilation pass: defaults for the pass parameters
//! and the access controllers to run before execution.

use std::collections::HashMap;
use std::path::Path;
use once_cell::sync::Lazy;
use serde::{Serialize, Deserialize};

use crate::query::error::{ContextError, Result};
use crate::query::registry::{PRM_ACCEPT_PARTIAL_RESULT, PRM_USER_AUTHEN_INFO};

pub const KEY_ACCEPT_PARTIAL_RESULT: &str = "olap.query.accept-partial-result";
pub const KEY_ACCESS_CONTROLLERS: &str = "olap.query.access-controllers";

// Process default, used when the caller has no configuration of its own
static DEFAULT_CONFIG: Lazy<QueryConfig> = Lazy::new(QueryConfig::default);

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Default for the AcceptPartialResult pass parameter
    pub accept_partial_result: bool,
    /// Names of access controllers to run, in order
    pub access_controllers: Vec<String>,
}

impl QueryConfig {
    /// The process-wide default configuration
    pub fn instance() -> &'static QueryConfig {
        &DEFAULT_CONFIG
    }

    /// Read settings from `key=value` properties; unknown keys are ignored
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = QueryConfig::default();
        if let Some(v) = props.get(KEY_ACCEPT_PARTIAL_RESULT) {
            config.accept_partial_result = v.trim().parse::<bool>().map_err(|_| {
                ContextError::Config(format!("{} must be true or false, got '{}'", KEY_ACCEPT_PARTIAL_RESULT, v))
            })?;
        }
        if let Some(v) = props.get(KEY_ACCESS_CONTROLLERS) {
            config.access_controllers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(config)
    }

    /// Parse a properties text: one `key=value` per line, `#` comments
    pub fn parse_properties(text: &str) -> Result<Self> {
        let mut props = HashMap::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ContextError::Config(format!("line {}: expected key=value", lineno + 1)))?;
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self::from_properties(&props)
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContextError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| ContextError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Pass parameters for a compilation pass run under this configuration
    pub fn pass_parameters(&self, user_info: Option<&str>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(PRM_ACCEPT_PARTIAL_RESULT.to_string(), self.accept_partial_result.to_string());
        if let Some(info) = user_info {
            params.insert(PRM_USER_AUTHEN_INFO.to_string(), info.to_string());
        }
        params
    }
}
