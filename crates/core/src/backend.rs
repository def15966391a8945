//! Backend trait: the language-model collaborator.
//!
//! A backend looks at the task and the monologue and proposes the next
//! action as a loose `{action, args}` request. The core treats the call as
//! opaque, possibly slow, and possibly failing; `Ok(None)` means the backend
//! had no usable decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BackendError;
use crate::event::Conversation;

/// An undecoded action proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,

    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, args: Map<String, Value>) -> Self {
        Self { action: action.into(), args }
    }
}

/// A command left running in the background by a `run` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundProcess {
    pub id: u64,
    pub command: String,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// A human-readable name (e.g. "openai").
    fn name(&self) -> &str;

    /// Propose the next action.
    async fn request_action(
        &self,
        instruction: &str,
        conversation: Conversation<'_>,
        model: &str,
        background_processes: &[BackgroundProcess],
    ) -> Result<Option<ActionRequest>, BackendError>;

    /// Produce a shorter list of entries summarizing `conversation`.
    ///
    /// Default implementation reports that summarizing isn't supported.
    async fn summarize(
        &self,
        _conversation: Conversation<'_>,
        _model: &str,
    ) -> Result<Vec<ActionRequest>, BackendError> {
        Err(BackendError::NotConfigured(format!(
            "Backend '{}' does not support summarization",
            self.name()
        )))
    }
}
