//! Per-connection request/reply state machine
//!
//! `AwaitRequest -> Dispatching -> Replying -> Closed`, with a direct jump to
//! `Closed` when the peer goes away before sending anything. Exactly one
//! exchange happens per connection.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wgagent_core::{Command, Dispatcher, Reply, Request, WireFormat};

/// Where a connection is in its single exchange
#[derive(Debug)]
enum State {
    AwaitRequest,
    Dispatching(Request),
    Replying(Reply),
    Closed(Option<Reply>),
}

/// Serves one request per accepted connection
pub struct ConnectionHandler {
    dispatcher: Arc<Dispatcher>,
    format: WireFormat,
    max_message_size: usize,
}

impl ConnectionHandler {
    pub fn new(dispatcher: Arc<Dispatcher>, format: WireFormat, max_message_size: usize) -> Self {
        Self {
            dispatcher,
            format,
            max_message_size: max_message_size.max(1),
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Run the exchange to completion and return the reply that was sent, if any.
    ///
    /// The stream is shut down on every path that reaches a reply; dropping it
    /// closes the connection otherwise. Cancelling `shutdown` abandons a request
    /// that has not fully arrived; a request already received is still served.
    pub async fn handle<S>(
        &self,
        mut stream: S,
        peer: &str,
        shutdown: &CancellationToken,
    ) -> Option<Reply>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut state = State::AwaitRequest;

        loop {
            state = match state {
                State::AwaitRequest => self.receive(&mut stream, peer, shutdown).await,
                State::Dispatching(request) => State::Replying(self.dispatch(request, peer).await),
                State::Replying(reply) => {
                    let sent = self.send_reply(&mut stream, reply, peer).await;
                    State::Closed(sent.then_some(reply))
                }
                State::Closed(sent) => return sent,
            };
        }
    }

    async fn receive<S>(&self, stream: &mut S, peer: &str, shutdown: &CancellationToken) -> State
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.max_message_size];
        let mut filled = 0;

        loop {
            let read = tokio::select! {
                read = stream.read(&mut buf[filled..]) => read,
                _ = shutdown.cancelled() => {
                    info!("Shutting down, dropping unfinished request from {}", peer);
                    return State::Closed(None);
                }
            };
            let n = match read {
                Ok(n) => n,
                Err(e) => {
                    warn!("Read error from {}: {}", peer, e);
                    return State::Closed(None);
                }
            };

            let eof = n == 0;
            if eof && filled == 0 {
                debug!("{} closed the connection without a request", peer);
                return State::Closed(None);
            }
            filled += n;
            debug!("Received {} bytes from {} ({} buffered)", n, peer, filled);

            match self.format.frame_request(&buf[..filled], eof) {
                Ok(Some(request)) => return State::Dispatching(request),
                Ok(None) if filled == buf.len() => {
                    warn!(
                        "Request from {} exceeds {} bytes, rejecting",
                        peer, self.max_message_size
                    );
                    return State::Replying(Reply::Nok);
                }
                Ok(None) => continue,
                Err(e) => {
                    warn!("Malformed {} message from {}: {}", self.format, peer, e);
                    return State::Replying(Reply::Nok);
                }
            }
        }
    }

    async fn dispatch(&self, request: Request, peer: &str) -> Reply {
        match request.command {
            Command::Hello => {
                info!(
                    ">>> cmd:=HELLO subcmd:={} ({} fields) from {}",
                    request.subcommand,
                    request.field_count(),
                    peer
                );
                let dispatcher = self.dispatcher.clone();
                let Request { subcommand, fields, .. } = request;

                let joined = tokio::task::spawn_blocking(move || {
                    dispatcher.dispatch(&subcommand, &fields)
                })
                .await;

                match joined {
                    Ok(success) => Reply::from_success(success),
                    Err(e) => {
                        warn!("Dispatch task for {} failed: {}", peer, e);
                        Reply::Nok
                    }
                }
            }
            Command::Bye => {
                info!(">>> cmd:=BYE from {}", peer);
                Reply::Ok
            }
            Command::Unknown => {
                info!(">>> UNKNOWN command from {}", peer);
                Reply::Nok
            }
        }
    }

    /// Write the reply and close; `false` if it never reached the socket
    async fn send_reply<S>(&self, stream: &mut S, reply: Reply, peer: &str) -> bool
    where
        S: AsyncWrite + Unpin,
    {
        let bytes = match self.format.encode_reply(reply) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to encode reply for {}: {}", peer, e);
                return false;
            }
        };

        if let Err(e) = stream.write_all(&bytes).await {
            warn!("Failed to send reply to {}: {}", peer, e);
            return false;
        }
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown of {} failed: {}", peer, e);
        }
        info!("<<< cmd:={} sent to {}", reply, peer);
        true
    }
}
