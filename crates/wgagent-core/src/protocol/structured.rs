//! Structured binary wire format
//!
//! The record mirrors the token layout of the text format but is serialized
//! as a whole with bincode, keeping the fixed array of sixteen slots. Unused
//! slots are empty strings and are never read on decode.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
use super::message::{Reply, Request, MAX_FIELDS};
use super::token::{self, CMD};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireRequest {
    cmd: String,
    subcmd: String,
    field_count: String,
    key_value: [String; MAX_FIELDS],
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WireReply {
    cmd: String,
}

pub fn encode_request(request: &Request) -> Result<Vec<u8>, EncodeError> {
    let mut tokens = token::request_tokens(request)?.into_iter();

    let mut wire = WireRequest {
        cmd: tokens.next().unwrap_or_default(),
        subcmd: tokens.next().unwrap_or_default(),
        field_count: tokens.next().unwrap_or_default(),
        ..WireRequest::default()
    };
    for (slot, value) in wire.key_value.iter_mut().zip(tokens) {
        *slot = value;
    }

    bincode::serialize(&wire).map_err(|e| EncodeError::Structured(e.to_string()))
}

pub fn decode_request(bytes: &[u8]) -> Result<Request, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let wire: WireRequest = bincode::deserialize(bytes).map_err(map_bincode_error)?;
    let keys: Vec<&str> = wire.key_value.iter().map(String::as_str).collect();

    token::assemble_request(&wire.cmd, Some(&wire.subcmd), Some(&wire.field_count), &keys)
}

/// Decode a request from a stream prefix, `Ok(None)` while the record is incomplete
pub fn frame_request(bytes: &[u8], eof: bool) -> Result<Option<Request>, DecodeError> {
    match decode_request(bytes) {
        Err(DecodeError::Incomplete | DecodeError::Empty) if !eof => Ok(None),
        other => other.map(Some),
    }
}

pub fn encode_reply(reply: Reply) -> Result<Vec<u8>, EncodeError> {
    // The reply token carries no line terminator in this format
    let wire = WireReply {
        cmd: format!("{}{}{}", CMD, token::SEPARATOR, reply.as_str()),
    };
    bincode::serialize(&wire).map_err(|e| EncodeError::Structured(e.to_string()))
}

pub fn decode_reply(bytes: &[u8]) -> Result<Reply, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let wire: WireReply = bincode::deserialize(bytes).map_err(map_bincode_error)?;
    Ok(Reply::parse(token::expect_token(&wire.cmd, CMD)?))
}

fn map_bincode_error(err: bincode::Error) -> DecodeError {
    match *err {
        bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            DecodeError::Incomplete
        }
        bincode::ErrorKind::InvalidUtf8Encoding(_) => DecodeError::InvalidUtf8,
        ref other => DecodeError::Structured(other.to_string()),
    }
}
