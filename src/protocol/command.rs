//! Command definitions
//!
//! `Request` is the JSON object on the wire; `Command` is the validated form.

use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};
use crate::store::LockMode;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Write,
    Read,
    Lock,
    Unlock,
}

impl CommandType {
    /// Name used in the `command` field
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Write => "write",
            CommandType::Read => "read",
            CommandType::Lock => "lock",
            CommandType::Unlock => "unlock",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "write" => Some(CommandType::Write),
            "read" => Some(CommandType::Read),
            "lock" => Some(CommandType::Lock),
            "unlock" => Some(CommandType::Unlock),
            _ => None,
        }
    }
}

/// A request exactly as it appears on the wire
///
/// Fields a command does not use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Missing or null is treated as an unknown command
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub hold_lock: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub report_skipped: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A parsed command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Store values for unlocked keys
    Write {
        keys: Vec<String>,
        values: Vec<String>,
        /// Keep applied keys locked in `write` mode afterwards
        hold_lock: bool,
        /// Report locked keys that were skipped
        report_skipped: bool,
    },

    /// Fetch values for unlocked, present keys
    Read { keys: Vec<String> },

    /// Lock keys (first mode wins)
    Lock { keys: Vec<String>, mode: LockMode },

    /// Remove locks regardless of mode
    Unlock { keys: Vec<String> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Write { .. } => CommandType::Write,
            Command::Read { .. } => CommandType::Read,
            Command::Lock { .. } => CommandType::Lock,
            Command::Unlock { .. } => CommandType::Unlock,
        }
    }

    /// Keys this command touches
    pub fn keys(&self) -> &[String] {
        match self {
            Command::Write { keys, .. }
            | Command::Read { keys }
            | Command::Lock { keys, .. }
            | Command::Unlock { keys } => keys,
        }
    }

    /// Plain write with no flags
    pub fn write(keys: Vec<String>, values: Vec<String>) -> Self {
        Command::Write {
            keys,
            values,
            hold_lock: false,
            report_skipped: false,
        }
    }
}

impl TryFrom<Request> for Command {
    type Error = KvError;

    fn try_from(request: Request) -> Result<Self> {
        let name = request.command.unwrap_or_default();
        let command_type = CommandType::parse(&name).ok_or(KvError::UnknownCommand(name))?;

        let keys = request.keys;
        let command = match command_type {
            CommandType::Write => Command::Write {
                keys,
                // Missing values behave like an empty list and fail the arity check
                values: request.values.unwrap_or_default(),
                hold_lock: request.hold_lock,
                report_skipped: request.report_skipped,
            },
            CommandType::Read => Command::Read { keys },
            CommandType::Lock => Command::Lock {
                keys,
                mode: match request.mode {
                    Some(mode) => mode.parse()?,
                    None => LockMode::default(),
                },
            },
            CommandType::Unlock => Command::Unlock { keys },
        };

        Ok(command)
    }
}

impl From<&Command> for Request {
    fn from(command: &Command) -> Self {
        let mut request = Request {
            command: Some(command.command_type().as_str().to_string()),
            keys: command.keys().to_vec(),
            ..Request::default()
        };

        match command {
            Command::Write {
                values,
                hold_lock,
                report_skipped,
                ..
            } => {
                request.values = Some(values.clone());
                request.hold_lock = *hold_lock;
                request.report_skipped = *report_skipped;
            }
            Command::Lock { mode, .. } => {
                request.mode = Some(mode.as_str().to_string());
            }
            Command::Read { .. } | Command::Unlock { .. } => {}
        }

        request
    }
}
