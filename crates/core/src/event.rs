//! Events: the atomic unit of agent history.
//!
//! Every thought, action, and observation the agent records becomes an
//! [`Event`]: a kind plus a map of named arguments. On the wire an event is
//! `{"action": <kind>, "args": {...}}`, which is the same shape handed to
//! backends and forwarded to clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker appended to truncated outputs.
pub const ELLIPSIS: &str = "...";

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Think,
    Run,
    Kill,
    Browse,
    Read,
    Write,
    Recall,
    Finish,
    Output,
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        Self::Think,
        Self::Run,
        Self::Kill,
        Self::Browse,
        Self::Read,
        Self::Write,
        Self::Recall,
        Self::Finish,
        Self::Output,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Think => "think",
            Self::Run => "run",
            Self::Kill => "kill",
            Self::Browse => "browse",
            Self::Read => "read",
            Self::Write => "write",
            Self::Recall => "recall",
            Self::Finish => "finish",
            Self::Output => "output",
            Self::Error => "error",
        }
    }

    /// Look up a kind by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// `output` and `error` record results; every other kind is something
    /// the agent decided to do.
    pub fn is_observation(&self) -> bool {
        matches!(self, Self::Output | Self::Error)
    }

    /// Tool-style actions, i.e. everything that is neither a thought, a
    /// result, nor the terminal `finish`.
    pub fn is_tool_action(&self) -> bool {
        !matches!(self, Self::Think | Self::Finish | Self::Output | Self::Error)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the monologue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "action")]
    pub kind: EventKind,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub args: Map<String, Value>,
}

impl Event {
    pub fn new(kind: EventKind, args: Map<String, Value>) -> Self {
        Self { kind, args }
    }

    /// Build an event from `(name, string)` argument pairs.
    pub fn with_args<'a>(kind: EventKind, args: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        let args = args
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v)))
            .collect();
        Self { kind, args }
    }

    pub fn think(thought: impl Into<String>) -> Self {
        Self::with_args(EventKind::Think, [("thought", thought.into())])
    }

    pub fn output(output: impl Into<String>) -> Self {
        Self::with_args(EventKind::Output, [("output", output.into())])
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self::with_args(EventKind::Error, [("output", output.into())])
    }

    /// A string argument, if present and a string.
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(Value::as_str)
    }

    /// Size of the compact JSON encoding, the unit the monologue budget is
    /// measured in.
    pub fn serialized_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }

    /// Clip an `output` argument longer than `max_chars` to exactly
    /// `max_chars` characters plus [`ELLIPSIS`]. Returns whether anything
    /// was cut.
    pub fn truncate_output(&mut self, max_chars: usize) -> bool {
        let Some(Value::String(output)) = self.args.get_mut("output") else {
            return false;
        };
        match output.char_indices().nth(max_chars) {
            Some((cut, _)) => {
                output.truncate(cut);
                output.push_str(ELLIPSIS);
                true
            }
            None => false,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A read-only, restartable view over a run of events.
///
/// `Conversation` is `Copy`: iterating it twice yields the same events in
/// the same order, and handing it to a backend never touches the log.
#[derive(Debug, Clone, Copy)]
pub struct Conversation<'a> {
    events: &'a [Event],
}

impl<'a> Conversation<'a> {
    pub fn new(events: &'a [Event]) -> Self {
        Self { events }
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&'a Event> {
        self.events.last()
    }

    pub fn as_slice(&self) -> &'a [Event] {
        self.events
    }

    /// The events as a JSON array, ready to embed in a prompt.
    pub fn to_json(&self) -> Value {
        Value::Array(self.events.iter().map(Event::to_value).collect())
    }
}

impl<'a> IntoIterator for Conversation<'a> {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
