//! Maps a subcommand and its parameters to a configuration action and runs it

pub mod cidr;
mod table;

pub use table::{Action, Subcommand};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::WireGuardConfig;
use crate::error::DispatchError;
use crate::executor::ActionExecutor;

/// Result of a successfully applied action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub action: Action,
    /// Whether the follow-up persist step succeeded
    pub persisted: bool,
}

/// Resolves subcommands and applies them through an [`ActionExecutor`]
pub struct Dispatcher {
    executor: Arc<dyn ActionExecutor>,
    wireguard: WireGuardConfig,
    /// Serializes apply + persist across connections
    write_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn ActionExecutor>, wireguard: WireGuardConfig) -> Self {
        Self {
            executor,
            wireguard,
            write_lock: Mutex::new(()),
        }
    }

    /// Resolve a subcommand and substitute its parameters without running anything
    pub fn resolve(&self, subcommand: &str, params: &[String]) -> Result<Action, DispatchError> {
        let resolved = Subcommand::from_name(subcommand)
            .ok_or_else(|| DispatchError::UnknownSubcommand(subcommand.to_string()))?;

        if params.len() != resolved.arity() {
            return Err(DispatchError::ArityMismatch {
                subcommand: resolved.name(),
                expected: resolved.arity(),
                got: params.len(),
            });
        }

        resolved.build(params, &self.wireguard)
    }

    /// Resolve and apply a subcommand, then persist the configuration.
    ///
    /// Persisting is best effort: a failure there is logged and reported in
    /// [`Applied::persisted`], but does not fail the request.
    pub fn execute(&self, subcommand: &str, params: &[String]) -> Result<Applied, DispatchError> {
        let action = self.resolve(subcommand, params)?;
        tracing::debug!("Resolved {} -> [{}]", subcommand, action);

        let _guard = self.write_lock.lock();

        self.executor.run(&action)?;

        let persisted = match self.executor.persist() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Applied [{}] but failed to persist configuration: {}", action, e);
                false
            }
        };

        Ok(Applied { action, persisted })
    }

    /// Apply a subcommand and collapse the outcome to success or failure
    pub fn dispatch(&self, subcommand: &str, params: &[String]) -> bool {
        match self.execute(subcommand, params) {
            Ok(applied) => {
                tracing::info!("{} applied: [{}]", subcommand, applied.action);
                true
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", subcommand, e);
                false
            }
        }
    }
}
