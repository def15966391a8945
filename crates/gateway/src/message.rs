//! Client and server message shapes.

use devloop_core::{Error, Event, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reply sent while no agent is available.
pub const NO_AGENT: &str = "No agent started. Please wait a second...";

/// An inbound message: `{action, args?, message?}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientMessage {
    pub action: String,

    #[serde(default)]
    pub args: Map<String, Value>,

    #[serde(default)]
    pub message: Option<String>,
}

impl ClientMessage {
    /// Decode a JSON value. Anything but an object with a string `action`
    /// is malformed.
    pub fn parse(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::MalformedClientMessage("Invalid event".into()));
        };
        if !map.get("action").is_some_and(Value::is_string) {
            return Err(Error::MalformedClientMessage("Invalid event".into()));
        }
        serde_json::from_value(Value::Object(map))
            .map_err(|e| Error::MalformedClientMessage(format!("Invalid event: {e}")))
    }

    /// A string argument that must be present.
    pub fn required_arg(&self, name: &str) -> Result<&str> {
        self.args
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingRequiredField(name.to_string()))
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// An agent event, `{action, args}`.
    Event(Event),
    /// `{action, message}`, e.g. the initialize acknowledgement.
    Status { action: String, message: String },
    /// `{error: true, message}`.
    Error { error: bool, message: String },
    /// `{message}`.
    Info { message: String },
}

impl ServerMessage {
    pub fn initialized() -> Self {
        Self::Status {
            action: "initialize".into(),
            message: "Control loop started.".into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: true,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
