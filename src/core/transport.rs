use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A driver command, named the way the wire protocol names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DriverCommand {
    Quit,
    SendKeysToElement,
    SendKeysToActiveElement,
    GetElementAttribute,
    Screenshot,
    SetTimeouts,
    ImplicitWait,
    Other(String),
}

impl DriverCommand {
    pub fn name(&self) -> &str {
        match self {
            DriverCommand::Quit => "quit",
            DriverCommand::SendKeysToElement => "sendKeysToElement",
            DriverCommand::SendKeysToActiveElement => "sendKeysToActiveElement",
            DriverCommand::GetElementAttribute => "getElementAttribute",
            DriverCommand::Screenshot => "screenshot",
            DriverCommand::SetTimeouts => "setTimeouts",
            DriverCommand::ImplicitWait => "implicitlyWait",
            DriverCommand::Other(name) => name,
        }
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, DriverCommand::Quit)
    }
}

impl fmt::Display for DriverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for DriverCommand {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Response of the underlying driver for one command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: Option<i64>,
    #[serde(default)]
    pub value: Value,
}

impl CommandResponse {
    pub fn ok(value: Value) -> Self {
        Self {
            status: None,
            value,
        }
    }

    pub fn failed(status: i64, value: Value) -> Self {
        Self {
            status: Some(status),
            value,
        }
    }

    /// Both a missing status and status 0 mean success.
    pub fn is_passed(&self) -> bool {
        matches!(self.status, None | Some(0))
    }
}

/// The driver connection commands are ultimately executed on.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn execute(&self, command: &DriverCommand, params: &Value) -> Result<CommandResponse>;
}
