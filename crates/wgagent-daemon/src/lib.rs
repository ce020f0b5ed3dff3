//! wgagent-daemon - Network side of the wgagent configuration agent
//!
//! This crate provides:
//! - The TCP listener and its per-connection request/reply handler
//! - The client sender used by callers on the same host
//! - Graceful shutdown through a cancellation token

pub mod client;
pub mod connection;
pub mod error;
pub mod server;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use wgagent_core::{executor, ActionExecutor, Config, Dispatcher, WireFormat};

pub use client::Client;
pub use connection::ConnectionHandler;
pub use error::{ClientError, ServerError};
pub use server::Server;

/// A configured but not yet listening agent
pub struct Daemon {
    listen_addr: String,
    handler: ConnectionHandler,
}

impl Daemon {
    /// Wire up executor, dispatcher and handler from the loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::with_executor(config, executor::from_config(&config.executor))
    }

    /// Same as [`Daemon::from_config`] with a caller-supplied executor
    pub fn with_executor(config: &Config, executor: Arc<dyn ActionExecutor>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(executor, config.wireguard.clone()));
        let handler = ConnectionHandler::new(
            dispatcher,
            config.server.wire_format,
            config.server.max_message_size,
        );

        Self {
            listen_addr: config.server.listen_addr.clone(),
            handler,
        }
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    pub fn wire_format(&self) -> WireFormat {
        self.handler.format()
    }

    /// Bind the listener without starting to accept
    pub async fn bind(self) -> Result<Server, ServerError> {
        Server::bind(&self.listen_addr, self.handler).await
    }

    /// Bind and serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        self.bind().await?.run(shutdown).await
    }
}
