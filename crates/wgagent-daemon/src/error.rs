use std::time::Duration;

use thiserror::Error;
use wgagent_core::{DecodeError, EncodeError, Reply};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a request did not come back `OK`
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Connection closed before a reply arrived")]
    Closed,

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Daemon replied {0}")]
    Rejected(Reply),
}
