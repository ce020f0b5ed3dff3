//! wgagent-core - Core library for the wgagent configuration agent
//!
//! This crate provides everything that does not touch the network:
//! - Request/reply model and the two interoperable wire formats
//! - Subcommand table and the dispatcher that maps requests to actions
//! - Execution of actions through the configuration shell
//! - Configuration management

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod protocol;

pub use config::Config;
pub use dispatch::{Action, Dispatcher, Subcommand};
pub use error::{AgentError, DecodeError, DispatchError, EncodeError, ExecError, Result};
pub use executor::{ActionExecutor, DryRunExecutor, VtyshExecutor};
pub use protocol::{Command, Reply, Request, WireFormat, MAX_FIELDS};
