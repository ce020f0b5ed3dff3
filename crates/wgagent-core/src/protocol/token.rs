//! `name:=value` tokens shared by both wire formats

use crate::error::{DecodeError, EncodeError};
use super::message::{Command, Request, MAX_FIELDS};

pub const SEPARATOR: &str = ":=";
pub const CMD: &str = "cmd";
pub const SUBCMD: &str = "subcmd";
pub const FIELD_COUNT: &str = "field_count";

/// Format a token with its trailing line terminator
pub fn format_token(name: &str, value: &str) -> String {
    format!("{}{}{}\n", name, SEPARATOR, value)
}

/// Name of the token carrying the parameter in slot `index` (0-based)
pub fn key_name(index: usize) -> String {
    format!("key{}", index + 1)
}

/// Split a token into name and value, dropping any trailing line terminator
pub fn split_token(token: &str) -> Result<(&str, &str), DecodeError> {
    let token = strip_terminator(token);
    token
        .split_once(SEPARATOR)
        .ok_or_else(|| DecodeError::MissingSeparator(token.to_string()))
}

/// Value of a token that must carry the given name
pub fn expect_token<'a>(token: &'a str, name: &str) -> Result<&'a str, DecodeError> {
    let (found, value) = split_token(token)?;
    if found != name {
        return Err(DecodeError::UnexpectedToken {
            expected: name.to_string(),
            found: found.to_string(),
        });
    }
    Ok(value)
}

fn strip_terminator(token: &str) -> &str {
    let token = token.strip_suffix('\n').unwrap_or(token);
    token.strip_suffix('\r').unwrap_or(token)
}

/// Header and field tokens of a request, in wire order
pub fn request_tokens(request: &Request) -> Result<Vec<String>, EncodeError> {
    if request.fields.len() > MAX_FIELDS {
        return Err(EncodeError::TooManyFields(request.fields.len()));
    }

    let mut tokens = Vec::with_capacity(3 + request.fields.len());
    tokens.push(format_token(CMD, request.command.as_str()));
    tokens.push(format_token(SUBCMD, checked(SUBCMD, &request.subcommand)?));
    tokens.push(format_token(FIELD_COUNT, &request.fields.len().to_string()));
    for (i, value) in request.fields.iter().enumerate() {
        let name = key_name(i);
        tokens.push(format_token(&name, checked(&name, value)?));
    }
    Ok(tokens)
}

fn checked<'a>(name: &str, value: &'a str) -> Result<&'a str, EncodeError> {
    if value.contains(['\n', '\r']) {
        return Err(EncodeError::EmbeddedNewline {
            token: name.to_string(),
        });
    }
    Ok(value)
}

/// Rebuild a request from its tokens.
///
/// `subcmd` and `field_count` may be absent for commands other than `HELLO`,
/// which then decode with no subcommand and no fields. Only the first
/// `field_count` entries of `keys` are read; an empty or missing entry in
/// that range means the message was cut short.
pub fn assemble_request(
    cmd: &str,
    subcmd: Option<&str>,
    field_count: Option<&str>,
    keys: &[&str],
) -> Result<Request, DecodeError> {
    let command = Command::parse(expect_token(cmd, CMD)?);

    let subcmd = subcmd.filter(|t| !t.is_empty());
    let field_count = field_count.filter(|t| !t.is_empty());

    if command != Command::Hello && subcmd.is_none() && field_count.is_none() {
        return Ok(Request {
            command,
            subcommand: String::new(),
            fields: Vec::new(),
        });
    }

    let subcommand = expect_token(subcmd.ok_or(DecodeError::MissingToken(SUBCMD))?, SUBCMD)?;
    let raw_count = expect_token(
        field_count.ok_or(DecodeError::MissingToken(FIELD_COUNT))?,
        FIELD_COUNT,
    )?;
    let count = parse_field_count(raw_count)?;

    let mut fields = Vec::with_capacity(count);
    for i in 0..count {
        let token = match keys.get(i) {
            Some(token) if !token.is_empty() => *token,
            _ => {
                return Err(DecodeError::Truncated {
                    expected: count,
                    found: i,
                })
            }
        };
        fields.push(expect_token(token, &key_name(i))?.to_string());
    }

    Ok(Request {
        command,
        subcommand: subcommand.to_string(),
        fields,
    })
}

pub(crate) fn parse_field_count(raw: &str) -> Result<usize, DecodeError> {
    let count: usize = raw
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidFieldCount(raw.to_string()))?;
    if count > MAX_FIELDS {
        return Err(DecodeError::TooManyFields(count));
    }
    Ok(count)
}
