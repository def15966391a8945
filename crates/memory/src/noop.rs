//! No-op memory: used when `memory.backend = "none"`.

use async_trait::async_trait;
use devloop_core::error::MemoryError;
use devloop_core::event::Event;
use devloop_core::memory::LongTermMemory;

/// Accepts every event and remembers none of them.
pub struct NoopMemory;

#[async_trait]
impl LongTermMemory for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn index(&self, _event: &Event) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<String>, MemoryError> {
        Ok(vec![])
    }

    async fn count(&self) -> usize {
        0
    }
}
