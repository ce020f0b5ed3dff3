//! Client side of the exchange: one request, one bounded wait for the reply

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use wgagent_core::config::ClientConfig;
use wgagent_core::{Reply, Request, WireFormat};

use crate::error::ClientError;

/// How long the sender waits for a reply before giving up
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Replies are a single token; anything longer is not a reply
const MAX_REPLY_SIZE: u64 = 1024;

#[derive(Debug, Clone)]
pub struct Client {
    addr: String,
    format: WireFormat,
    timeout: Duration,
}

impl Client {
    pub fn new(addr: impl Into<String>, format: WireFormat) -> Self {
        Self {
            addr: addr.into(),
            format,
            timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.addr.clone(), config.wire_format)
            .with_timeout(Duration::from_millis(config.reply_timeout_ms))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Send `HELLO` with the given subcommand and report whether the daemon said `OK`.
    ///
    /// Every failure (connect, write, timeout, decode, `NOK`) is logged and
    /// reported as `false`. Nothing is retried.
    pub async fn send(&self, subcommand: &str, params: &[String]) -> bool {
        let request = Request::hello(subcommand, params.to_vec());
        match self.expect_ok(&request).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("{} to {} failed: {}", subcommand, self.addr, e);
                false
            }
        }
    }

    /// Tell the daemon the session is over
    pub async fn bye(&self) -> bool {
        match self.expect_ok(&Request::bye()).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("BYE to {} failed: {}", self.addr, e);
                false
            }
        }
    }

    /// Like [`Client::request`], but a `NOK` reply is an error
    pub async fn expect_ok(&self, request: &Request) -> Result<(), ClientError> {
        match self.request(request).await? {
            Reply::Ok => Ok(()),
            other => Err(ClientError::Rejected(other)),
        }
    }

    /// Perform one exchange and return whatever reply came back
    pub async fn request(&self, request: &Request) -> Result<Reply, ClientError> {
        let payload = self.format.encode_request(request)?;

        let mut stream = timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))?
            .map_err(|source| ClientError::Connect {
                addr: self.addr.clone(),
                source,
            })?;

        tracing::debug!(
            "Sending cmd:={} subcmd:={} ({} fields) to {}",
            request.command,
            request.subcommand,
            request.field_count(),
            self.addr
        );
        stream.write_all(&payload).await?;
        stream.flush().await?;

        let mut buf = Vec::new();
        let mut limited = (&mut stream).take(MAX_REPLY_SIZE);
        timeout(self.timeout, limited.read_to_end(&mut buf))
            .await
            .map_err(|_| ClientError::Timeout(self.timeout))??;

        if buf.is_empty() {
            return Err(ClientError::Closed);
        }

        let reply = self.format.decode_reply(&buf)?;
        tracing::debug!("Reply from {}: {}", self.addr, reply);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_from_config() {
        let config = ClientConfig {
            addr: "10.0.0.1:9000".to_string(),
            wire_format: WireFormat::Text,
            reply_timeout_ms: 500,
        };
        let client = Client::from_config(&config);
        assert_eq!(client.addr(), "10.0.0.1:9000");
        assert_eq!(client.format, WireFormat::Text);
        assert_eq!(client.timeout, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_connect_refused_is_false() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::new(addr.to_string(), WireFormat::Text);
        assert!(!client.send("REBOOT_SYSTEM", &[]).await);
    }

    #[tokio::test]
    async fn test_closed_without_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
        });

        let client = Client::new(addr.to_string(), WireFormat::Text);
        let result = client.request(&Request::bye()).await;
        assert!(matches!(result, Err(ClientError::Closed)));
    }

    #[tokio::test]
    async fn test_nok_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            socket.write_all(b"cmd:=NOK\n").await.unwrap();
        });

        let client = Client::new(addr.to_string(), WireFormat::Text);
        let result = client.expect_ok(&Request::hello("REBOOT_SYSTEM", vec![])).await;
        assert!(matches!(result, Err(ClientError::Rejected(Reply::Nok))));
    }

    #[tokio::test]
    async fn test_ok_reply_is_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            socket.write_all(b"cmd:=OK\n").await.unwrap();
        });

        let client = Client::new(addr.to_string(), WireFormat::Text);
        assert_eq!(client.request(&Request::bye()).await.unwrap(), Reply::Ok);
    }
}
