//! Request and reply records exchanged between the UI and the agent

use std::fmt;

/// Number of parameter slots a request can carry
pub const MAX_FIELDS: usize = 16;

/// Top-level command of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Carry out the request's subcommand
    Hello,
    /// Close the session, nothing to do
    Bye,
    /// Anything else the peer sent
    Unknown,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Hello => "HELLO",
            Command::Bye => "BYE",
            Command::Unknown => "UNKNOWN",
        }
    }

    /// Parse a command tag; unrecognized tags become `Unknown`
    pub fn parse(tag: &str) -> Self {
        match tag {
            "HELLO" => Command::Hello,
            "BYE" => Command::Bye,
            _ => Command::Unknown,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One configuration command sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    /// Action name, meaningful only for `Hello`
    pub subcommand: String,
    /// Positional parameters for the subcommand
    pub fields: Vec<String>,
}

impl Request {
    /// Build a `HELLO` request carrying a subcommand and its parameters
    pub fn hello(subcommand: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            command: Command::Hello,
            subcommand: subcommand.into(),
            fields,
        }
    }

    /// Build a `BYE` request
    pub fn bye() -> Self {
        Self {
            command: Command::Bye,
            subcommand: String::new(),
            fields: Vec::new(),
        }
    }

    /// Number of populated parameter slots
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Outcome tag sent back by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reply {
    Ok,
    Nok,
    Unknown,
}

impl Reply {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reply::Ok => "OK",
            Reply::Nok => "NOK",
            Reply::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "OK" => Reply::Ok,
            "NOK" => Reply::Nok,
            _ => Reply::Unknown,
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Reply::Ok
        } else {
            Reply::Nok
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
