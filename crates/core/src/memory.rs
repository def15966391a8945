//! Long-term memory trait: an append-only, text-searchable index of events.
//!
//! Unlike the monologue, long-term memory is never condensed or pruned. The
//! agent feeds it every event it records and queries it for `recall`
//! actions.

use async_trait::async_trait;
use tracing::warn;

use crate::error::MemoryError;
use crate::event::Event;

#[async_trait]
pub trait LongTermMemory: Send + Sync {
    /// The backend name (e.g. "in_memory", "none").
    fn name(&self) -> &str;

    /// Index an event for later retrieval.
    async fn index(&self, event: &Event) -> Result<(), MemoryError>;

    /// Most relevant stored fragments for `query`, best first. Ties are
    /// broken by recency, most recent first.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, MemoryError>;

    /// Number of indexed events.
    async fn count(&self) -> usize;

    /// Best-effort indexing: failures are logged, never returned.
    async fn add_event(&self, event: &Event) {
        if let Err(e) = self.index(event).await {
            warn!(memory = %self.name(), kind = %event.kind, error = %e, "Failed to index event");
        }
    }
}
