//! TCP listener that hands each accepted connection to its own task

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::connection::ConnectionHandler;
use crate::error::ServerError;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub struct Server {
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
}

impl Server {
    pub async fn bind(addr: &str, handler: ConnectionHandler) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            handler: Arc::new(handler),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled, then wait for the
    /// in-flight exchanges to finish.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let local = self.local_addr()?;
        tracing::info!("Listening on {} ({} format)", local, self.handler.format());

        let tracker = TaskTracker::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            tracing::warn!("Accept failed: {}", e);
                            continue;
                        }
                    };

                    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("[conn {}] accepted {}", conn_id, peer);

                    let handler = self.handler.clone();
                    let shutdown = shutdown.clone();
                    tracker.spawn(async move {
                        let label = format!("{} (conn {})", peer, conn_id);
                        handler.handle(socket, &label, &shutdown).await;
                        tracing::debug!("[conn {}] closed", conn_id);
                    });
                }
            }
        }

        tracker.close();
        if !tracker.is_empty() {
            tracing::info!("Waiting for {} open connection(s)", tracker.len());
        }
        tracker.wait().await;
        tracing::info!("Listener on {} stopped", local);
        Ok(())
    }
}
