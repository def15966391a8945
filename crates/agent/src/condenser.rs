//! Condensers turn a run of older events into a shorter summary.

use std::sync::Arc;

use async_trait::async_trait;
use devloop_core::backend::{ActionRequest, Backend};
use devloop_core::error::Result;
use devloop_core::event::{Conversation, ELLIPSIS, Event, EventKind};
use tracing::warn;

#[async_trait]
pub trait Condenser: Send + Sync {
    fn name(&self) -> &str;

    /// Summarize `prefix`. The caller checks the result is smaller.
    async fn condense(&self, prefix: Conversation<'_>) -> Result<Vec<Event>>;
}

/// Replaces the prefix with a single `think` event holding one clipped
/// line per event. Needs no backend and always produces a result.
#[derive(Debug, Clone)]
pub struct DigestCondenser {
    /// Characters kept from each event's text.
    pub clip: usize,
}

impl Default for DigestCondenser {
    fn default() -> Self {
        Self { clip: 60 }
    }
}

impl DigestCondenser {
    fn line(&self, event: &Event) -> String {
        let text = event
            .args
            .values()
            .find_map(|v| v.as_str())
            .unwrap_or_default()
            .replace('\n', " ");
        let clipped = match text.char_indices().nth(self.clip) {
            Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
            None => text,
        };
        format!("- {}: {}", event.kind, clipped)
    }

    pub fn digest(&self, prefix: Conversation<'_>) -> Event {
        let mut thought = String::from("Earlier in this task:");
        for event in prefix {
            thought.push('\n');
            thought.push_str(&self.line(event));
        }
        Event::think(thought)
    }
}

#[async_trait]
impl Condenser for DigestCondenser {
    fn name(&self) -> &str {
        "digest"
    }

    async fn condense(&self, prefix: Conversation<'_>) -> Result<Vec<Event>> {
        Ok(vec![self.digest(prefix)])
    }
}

/// Asks the backend to summarize, falling back to a digest when the
/// backend fails or returns nothing.
pub struct BackendCondenser {
    backend: Arc<dyn Backend>,
    model: String,
    fallback: DigestCondenser,
}

impl BackendCondenser {
    pub fn new(backend: Arc<dyn Backend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            fallback: DigestCondenser::default(),
        }
    }
}

/// Map one summary entry onto an event. `summarize` entries and unknown
/// kinds become thoughts; known kinds keep their shape.
pub fn summary_entry_to_event(entry: ActionRequest) -> Event {
    if entry.action == "summarize" {
        let summary = entry
            .args
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        return Event::think(summary);
    }
    match EventKind::parse(&entry.action) {
        Some(kind) => Event::new(kind, entry.args),
        None => {
            let raw = serde_json::to_string(&entry).unwrap_or_else(|_| entry.action.clone());
            Event::think(raw)
        }
    }
}

#[async_trait]
impl Condenser for BackendCondenser {
    fn name(&self) -> &str {
        "backend"
    }

    async fn condense(&self, prefix: Conversation<'_>) -> Result<Vec<Event>> {
        match self.backend.summarize(prefix, &self.model).await {
            Ok(entries) if !entries.is_empty() => {
                Ok(entries.into_iter().map(summary_entry_to_event).collect())
            }
            Ok(_) => {
                warn!(backend = self.backend.name(), "Empty summary, using digest");
                self.fallback.condense(prefix).await
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Summarize failed, using digest");
                self.fallback.condense(prefix).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedBackend;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> ActionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn digest_clips_each_line() {
        let events = vec![Event::think("short"), Event::output("o".repeat(500))];
        let digest = DigestCondenser { clip: 10 }.digest(Conversation::new(&events));
        let thought = digest.arg_str("thought").unwrap();
        assert!(thought.contains("- think: short"));
        assert!(thought.contains(&format!("- output: {}{ELLIPSIS}", "o".repeat(10))));
    }

    #[test]
    fn summary_entries_map_to_events() {
        let event = summary_entry_to_event(entry(json!({"action": "summarize", "args": {"summary": "ran ls"}})));
        assert_eq!(event, Event::think("ran ls"));

        let event = summary_entry_to_event(entry(json!({"action": "run", "args": {"command": "ls"}})));
        assert_eq!(event.kind, EventKind::Run);
        assert_eq!(event.arg_str("command"), Some("ls"));

        let event = summary_entry_to_event(entry(json!({"action": "ponder", "args": {"x": 1}})));
        assert_eq!(event.kind, EventKind::Think);
        assert!(event.arg_str("thought").unwrap().contains("ponder"));
    }

    #[tokio::test]
    async fn backend_summary_is_used() {
        let backend = ScriptedBackend::new(vec![]).with_summary(vec![entry(
            json!({"action": "summarize", "args": {"summary": "set up the project"}}),
        )]);
        let condenser = BackendCondenser::new(Arc::new(backend), "m");
        let events = vec![Event::think("a"), Event::think("b")];
        let out = condenser.condense(Conversation::new(&events)).await.unwrap();
        assert_eq!(out, vec![Event::think("set up the project")]);
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_digest() {
        let condenser = BackendCondenser::new(Arc::new(ScriptedBackend::new(vec![])), "m");
        let events = vec![Event::think("a"), Event::output("b")];
        let out = condenser.condense(Conversation::new(&events)).await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].arg_str("thought").unwrap().starts_with("Earlier in this task:"));
    }
}
