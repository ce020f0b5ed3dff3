use thiserror::Error;

use crate::config::ConfigError;

/// Failure to turn wire bytes into a request or reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Empty message")]
    Empty,

    #[error("Message is not valid UTF-8")]
    InvalidUtf8,

    #[error("Token is missing its ':=' separator: {0:?}")]
    MissingSeparator(String),

    #[error("Expected token '{expected}', found '{found}'")]
    UnexpectedToken { expected: String, found: String },

    #[error("Missing '{0}' token")]
    MissingToken(&'static str),

    #[error("Invalid field count: {0:?}")]
    InvalidFieldCount(String),

    #[error("Too many fields: {0} (max {max})", max = crate::protocol::MAX_FIELDS)]
    TooManyFields(usize),

    #[error("Truncated message: expected {expected} fields, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("Message ends mid-record")]
    Incomplete,

    #[error("Unexpected data after the last field: {0:?}")]
    TrailingData(String),

    #[error("Structured decoding failed: {0}")]
    Structured(String),
}

/// Failure to turn a request or reply into wire bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Too many fields: {0} (max {max})", max = crate::protocol::MAX_FIELDS)]
    TooManyFields(usize),

    #[error("Value of '{token}' contains a line terminator")]
    EmbeddedNewline { token: String },

    #[error("Structured encoding failed: {0}")]
    Structured(String),
}

/// Failure of the external configuration shell
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}", describe_exit(.code))]
    ExitStatus { command: String, code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Reasons a subcommand cannot be carried out
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown subcommand: {0:?}")]
    UnknownSubcommand(String),

    #[error("{subcommand} takes {expected} parameter(s), got {got}")]
    ArityMismatch {
        subcommand: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Invalid parameter {index}: {reason}")]
    InvalidParameter { index: usize, reason: String },

    #[error("Action failed: {0}")]
    Execution(#[from] ExecError),
}

impl DispatchError {
    pub(crate) fn invalid(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
