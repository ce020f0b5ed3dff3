//! Wire protocol between the UI process and the agent
//!
//! One request and one reply per connection. Both sides must agree on the
//! [`WireFormat`] up front; it is configured, never negotiated.

mod message;
pub mod structured;
pub mod text;
pub mod token;

pub use message::{Command, Reply, Request, MAX_FIELDS};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};

/// Encoding used on the connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Self-describing binary record
    #[default]
    Structured,
    /// Plain concatenation of newline-terminated tokens
    Text,
}

impl WireFormat {
    pub fn encode_request(self, request: &Request) -> Result<Vec<u8>, EncodeError> {
        match self {
            WireFormat::Structured => structured::encode_request(request),
            WireFormat::Text => text::encode_request(request),
        }
    }

    pub fn decode_request(self, bytes: &[u8]) -> Result<Request, DecodeError> {
        match self {
            WireFormat::Structured => structured::decode_request(bytes),
            WireFormat::Text => text::decode_request(bytes),
        }
    }

    /// Decode a request from the bytes received so far.
    ///
    /// `Ok(None)` means the request is not complete yet and more bytes are
    /// needed. `eof` marks that the peer will send nothing more.
    pub fn frame_request(self, bytes: &[u8], eof: bool) -> Result<Option<Request>, DecodeError> {
        match self {
            WireFormat::Structured => structured::frame_request(bytes, eof),
            WireFormat::Text => text::frame_request(bytes, eof),
        }
    }

    pub fn encode_reply(self, reply: Reply) -> Result<Vec<u8>, EncodeError> {
        match self {
            WireFormat::Structured => structured::encode_reply(reply),
            WireFormat::Text => Ok(text::encode_reply(reply)),
        }
    }

    pub fn decode_reply(self, bytes: &[u8]) -> Result<Reply, DecodeError> {
        match self {
            WireFormat::Structured => structured::decode_reply(bytes),
            WireFormat::Text => text::decode_reply(bytes),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Structured => "structured",
            WireFormat::Text => "text",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown wire format '{0}' (expected 'structured' or 'text')")]
pub struct ParseWireFormatError(String);

impl FromStr for WireFormat {
    type Err = ParseWireFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "structured" | "binary" => Ok(WireFormat::Structured),
            "text" => Ok(WireFormat::Text),
            _ => Err(ParseWireFormatError(s.to_string())),
        }
    }
}
