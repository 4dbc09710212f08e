// Access Control Contract
//
// Pluggable checks that see every context of a compilation pass before
// execution and may reject the query. Policies live outside this crate.

use log::info;

use crate::common::types::ContextRef;
use crate::config::QueryConfig;
use super::error::{ContextError, Result};
use super::registry;

/// A policy hook run over all contexts of one compilation pass
pub trait AccessController: Send + Sync {
    /// Name used to enable the controller in configuration
    fn name(&self) -> &str;

    /// Return `ContextError::AccessDenied` to reject the query
    fn check(&self, contexts: &[ContextRef], config: &QueryConfig) -> Result<()>;
}

/// The controllers enabled by configuration, in configured order
pub struct AccessControl {
    controllers: Vec<Box<dyn AccessController>>,
}

impl AccessControl {
    /// Pick the controllers named in `config` out of `available`. Naming a
    /// controller that is not available is a configuration error.
    pub fn from_config(config: &QueryConfig, mut available: Vec<Box<dyn AccessController>>) -> Result<Self> {
        let mut controllers = Vec::with_capacity(config.access_controllers.len());
        for name in &config.access_controllers {
            let idx = available
                .iter()
                .position(|c| c.name() == name)
                .ok_or_else(|| ContextError::Config(format!("unknown access controller '{}'", name)))?;
            controllers.push(available.swap_remove(idx));
        }
        Ok(AccessControl { controllers })
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Run every controller over `contexts`; the first rejection wins
    pub fn check(&self, contexts: &[ContextRef], config: &QueryConfig) -> Result<()> {
        for controller in &self.controllers {
            if let Err(e) = controller.check(contexts, config) {
                info!("query rejected by access controller {}: {}", controller.name(), e);
                return Err(match e {
                    ContextError::AccessDenied(_) => e,
                    other => ContextError::AccessDenied(other.to_string()),
                });
            }
        }
        Ok(())
    }

    /// Check the contexts registered on the current worker
    pub fn check_current_pass(&self, config: &QueryConfig) -> Result<()> {
        let contexts = registry::thread_local_contexts().unwrap_or_default();
        self.check(&contexts, config)
    }
}
