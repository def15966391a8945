//! In-memory store: the default long-term memory for a session.

use async_trait::async_trait;
use devloop_core::error::MemoryError;
use devloop_core::event::Event;
use devloop_core::memory::LongTermMemory;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::vector::{TermVector, cosine_similarity};

struct IndexedEvent {
    /// Compact JSON of the event, returned verbatim by `search`.
    fragment: String,
    terms: TermVector,
}

/// Stores every indexed event in a Vec and ranks them by cosine similarity
/// of their term vectors to the query.
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<IndexedEvent>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The searchable text of an event: its kind and every argument value.
fn searchable_text(event: &Event) -> String {
    let mut text = String::from(event.kind.as_str());
    for value in event.args.values() {
        text.push(' ');
        match value {
            Value::String(s) => text.push_str(s),
            other => text.push_str(&other.to_string()),
        }
    }
    text
}

#[async_trait]
impl LongTermMemory for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn index(&self, event: &Event) -> Result<(), MemoryError> {
        let fragment =
            serde_json::to_string(event).map_err(|e| MemoryError::Indexing(e.to_string()))?;
        let terms = TermVector::from_text(&searchable_text(event));
        self.entries.write().await.push(IndexedEvent { fragment, terms });
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, MemoryError> {
        let query_terms = TermVector::from_text(query);
        let entries = self.entries.read().await;

        let mut scored: Vec<(f32, usize)> = entries
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                let score = cosine_similarity(&query_terms, &entry.terms);
                (score > 0.0).then_some((score, position))
            })
            .collect();

        // Best score first; equal scores go to the later entry.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.cmp(&a.1))
        });
        scored.truncate(limit);

        debug!(query, hits = scored.len(), "Memory search");
        Ok(scored
            .into_iter()
            .map(|(_, position)| entries[position].fragment.clone())
            .collect())
    }

    async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}
