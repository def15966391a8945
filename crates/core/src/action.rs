//! Actions: what the agent decided to do.
//!
//! The variant set is closed. Encoding an [`Action`] into an [`Event`] is an
//! exhaustive match and cannot fail; decoding goes through the event kind
//! name and fails with [`Error::UnknownActionKind`] for anything outside the
//! set, or [`Error::InvalidActionArgs`] when a required argument is missing.

use serde_json::{Map, Value};

use crate::backend::ActionRequest;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a shell command, optionally detached in the background.
    Run { command: String, background: bool },
    /// Kill a background command by id.
    Kill { id: u64 },
    BrowseUrl { url: String },
    FileRead { path: String },
    FileWrite { path: String, content: String },
    /// Search long-term memory.
    Recall { query: String },
    Think { thought: String },
    Finish,
}

impl Action {
    pub fn think(thought: impl Into<String>) -> Self {
        Self::Think { thought: thought.into() }
    }

    pub fn run(command: impl Into<String>) -> Self {
        Self::Run { command: command.into(), background: false }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Run { .. } => EventKind::Run,
            Self::Kill { .. } => EventKind::Kill,
            Self::BrowseUrl { .. } => EventKind::Browse,
            Self::FileRead { .. } => EventKind::Read,
            Self::FileWrite { .. } => EventKind::Write,
            Self::Recall { .. } => EventKind::Recall,
            Self::Think { .. } => EventKind::Think,
            Self::Finish => EventKind::Finish,
        }
    }

    /// Encode as the `{action, args}` event recorded in history.
    pub fn to_event(&self) -> Event {
        let mut args = Map::new();
        match self {
            Self::Run { command, background } => {
                args.insert("command".into(), Value::String(command.clone()));
                if *background {
                    args.insert("background".into(), Value::Bool(true));
                }
            }
            Self::Kill { id } => {
                args.insert("id".into(), Value::from(*id));
            }
            Self::BrowseUrl { url } => {
                args.insert("url".into(), Value::String(url.clone()));
            }
            Self::FileRead { path } => {
                args.insert("file".into(), Value::String(path.clone()));
            }
            Self::FileWrite { path, content } => {
                args.insert("file".into(), Value::String(path.clone()));
                args.insert("content".into(), Value::String(content.clone()));
            }
            Self::Recall { query } => {
                args.insert("query".into(), Value::String(query.clone()));
            }
            Self::Think { thought } => {
                args.insert("thought".into(), Value::String(thought.clone()));
            }
            Self::Finish => {}
        }
        Event::new(self.kind(), args)
    }

    /// Decode a recorded event back into an action.
    pub fn from_event(event: &Event) -> Result<Self> {
        Self::decode(event.kind, &event.args)
    }

    /// Decode a backend decision.
    pub fn from_request(request: &ActionRequest) -> Result<Self> {
        let kind = EventKind::parse(&request.action)
            .ok_or_else(|| Error::UnknownActionKind(request.action.clone()))?;
        Self::decode(kind, &request.args)
    }

    fn decode(kind: EventKind, args: &Map<String, Value>) -> Result<Self> {
        let action = match kind {
            EventKind::Run => Self::Run {
                command: required_str(kind, args, &["command"])?,
                background: flag(args, "background"),
            },
            EventKind::Kill => Self::Kill { id: required_id(kind, args)? },
            EventKind::Browse => Self::BrowseUrl { url: required_str(kind, args, &["url"])? },
            EventKind::Read => Self::FileRead {
                path: required_str(kind, args, &["file", "path"])?,
            },
            EventKind::Write => Self::FileWrite {
                path: required_str(kind, args, &["file", "path"])?,
                content: required_str(kind, args, &["content", "contents"])?,
            },
            EventKind::Recall => Self::Recall { query: required_str(kind, args, &["query"])? },
            EventKind::Think => Self::Think { thought: required_str(kind, args, &["thought"])? },
            EventKind::Finish => Self::Finish,
            EventKind::Output | EventKind::Error => {
                return Err(Error::UnknownActionKind(kind.as_str().to_string()));
            }
        };
        Ok(action)
    }
}

impl TryFrom<&ActionRequest> for Action {
    type Error = Error;

    fn try_from(request: &ActionRequest) -> Result<Self> {
        Self::from_request(request)
    }
}

impl From<&Action> for Event {
    fn from(action: &Action) -> Self {
        action.to_event()
    }
}

fn required_str(kind: EventKind, args: &Map<String, Value>, names: &[&str]) -> Result<String> {
    names
        .iter()
        .find_map(|name| args.get(*name).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidActionArgs {
            kind: kind.to_string(),
            reason: format!("missing string argument '{}'", names[0]),
        })
}

fn required_id(kind: EventKind, args: &Map<String, Value>) -> Result<u64> {
    let id = match args.get("id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| Error::InvalidActionArgs {
        kind: kind.to_string(),
        reason: "'id' must be a non-negative integer".into(),
    })
}

fn flag(args: &Map<String, Value>, name: &str) -> bool {
    match args.get(name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
