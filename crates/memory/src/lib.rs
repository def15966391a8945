//! Long-term memory stores for devloop agents.

pub mod in_memory;
pub mod noop;
pub mod vector;

use std::sync::Arc;

use devloop_config::MemoryConfig;
use devloop_core::LongTermMemory;
use tracing::warn;

pub use in_memory::InMemoryStore;
pub use noop::NoopMemory;
pub use vector::{TermVector, cosine_similarity};

/// Build the store named by `memory.backend`.
///
/// Names outside the set accepted by config validation fall back to the
/// in-memory store with a warning.
pub fn build_from_config(config: &MemoryConfig) -> Arc<dyn LongTermMemory> {
    match config.backend.as_str() {
        "in_memory" => Arc::new(InMemoryStore::new()),
        "none" => Arc::new(NoopMemory),
        other => {
            warn!(backend = other, "Unknown memory backend; using in_memory");
            Arc::new(InMemoryStore::new())
        }
    }
}
