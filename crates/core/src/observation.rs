//! Observations: the results of carrying out an action.
//!
//! Every observation folds into history as either an `output` event or, for
//! a failed command, an `error` event. The reverse mapping only knows those
//! two kinds; anything else is an [`Error::UnknownObservationKind`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "observation", rename_all = "snake_case")]
pub enum Observation {
    /// Output of a shell command. `error` marks stderr / non-zero exit.
    CmdOutput {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command_id: Option<u64>,
        command: String,
        content: String,
        error: bool,
    },
    Browser { url: String, content: String },
    FileRead { path: String, content: String },
    FileWrite { path: String },
    Recall { query: String, memories: Vec<String> },
    /// A message typed by the user while the task runs.
    UserMessage { message: String },
    /// Generic text result. Empty content is the null observation.
    Output { content: String },
}

impl Observation {
    /// The observation recorded for actions that produce nothing.
    pub fn null() -> Self {
        Self::Output { content: String::new() }
    }

    pub fn content(&self) -> String {
        match self {
            Self::CmdOutput { content, .. }
            | Self::Browser { content, .. }
            | Self::FileRead { content, .. }
            | Self::Output { content } => content.clone(),
            Self::FileWrite { .. } => String::new(),
            Self::Recall { memories, .. } => memories.join("\n"),
            Self::UserMessage { message } => message.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::CmdOutput { error: true, .. })
    }

    /// Encode as the `output` / `error` event recorded in history.
    pub fn to_event(&self) -> Event {
        if self.is_error() {
            Event::error(self.content())
        } else {
            Event::output(self.content())
        }
    }

    /// Decode an `output` / `error` event.
    pub fn from_event(event: &Event) -> Result<Self> {
        let content = event.arg_str("output").unwrap_or_default().to_string();
        match event.kind {
            EventKind::Output => Ok(Self::Output { content }),
            EventKind::Error => Ok(Self::CmdOutput {
                command_id: None,
                command: String::new(),
                content,
                error: true,
            }),
            other => Err(Error::UnknownObservationKind(other.to_string())),
        }
    }
}

impl From<&Observation> for Event {
    fn from(observation: &Observation) -> Self {
        observation.to_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(content: &str, error: bool) -> Observation {
        Observation::CmdOutput {
            command_id: None,
            command: "ls".into(),
            content: content.into(),
            error,
        }
    }

    #[test]
    fn failed_command_encodes_as_error() {
        let event = cmd("No such file", true).to_event();
        assert_eq!(event.kind, EventKind::Error);
        assert_eq!(event.arg_str("output"), Some("No such file"));
    }

    #[test]
    fn successful_command_encodes_as_output() {
        let event = cmd("a.txt", false).to_event();
        assert_eq!(event.kind, EventKind::Output);
    }

    #[test]
    fn generic_observations_encode_as_output() {
        let obs = Observation::Browser { url: "x".into(), content: "<html/>".into() };
        assert_eq!(obs.to_event(), Event::output("<html/>"));

        let obs = Observation::Recall { query: "q".into(), memories: vec!["a".into(), "b".into()] };
        assert_eq!(obs.to_event(), Event::output("a\nb"));

        assert_eq!(Observation::null().to_event(), Event::output(""));
    }

    #[test]
    fn decodes_output_and_error_events() {
        let obs = Observation::from_event(&Event::output("done")).unwrap();
        assert_eq!(obs, Observation::Output { content: "done".into() });

        let obs = Observation::from_event(&Event::error("boom")).unwrap();
        assert!(obs.is_error());
        assert_eq!(obs.content(), "boom");
    }

    #[test]
    fn action_events_are_not_observations() {
        let err = Observation::from_event(&Event::think("hmm")).unwrap_err();
        assert!(matches!(err, Error::UnknownObservationKind(k) if k == "think"));
    }
}
