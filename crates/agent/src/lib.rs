//! The devloop agent: a monologue-driven control step and the loop that
//! drives it.
//!
//! Each turn follows the same cycle:
//!
//! 1. **Fold** the previous action and its observation into the monologue
//! 2. **Ask** the backend for the next action, showing it the monologue
//! 3. **Act** through the executor (or agent memory, for `recall`)
//! 4. **Observe** the result and queue it for the next turn
//!
//! The loop ends when the agent decides to `finish`, the task is
//! cancelled, or the iteration limit is reached.

pub mod bootstrap;
pub mod condenser;
pub mod controller;
pub mod monologue;
pub mod monologue_agent;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;
use std::time::Duration;

use devloop_config::SessionSettings;
use devloop_core::{AgentContext, AgentRegistry, Backend, Error, ExecutorError, LongTermMemory, Result};
use devloop_tools::WorkspaceExecutor;
use tracing::info;

pub use condenser::{BackendCondenser, Condenser, DigestCondenser};
pub use controller::{AgentController, TaskOutcome};
pub use monologue::Monologue;
pub use monologue_agent::MonologueAgent;
pub use registry::{MONOLOGUE_AGENT, default_registry};

/// Build the controller for one session: resolve the agent kind, prepare
/// the workspace directory, and wire the agent to a workspace executor.
pub async fn build_controller(
    registry: &AgentRegistry,
    settings: &SessionSettings,
    backend: Arc<dyn Backend>,
    memory: Arc<dyn LongTermMemory>,
) -> Result<AgentController> {
    let factory = registry.get(&settings.agent_kind)?;

    tokio::fs::create_dir_all(&settings.directory)
        .await
        .map_err(|e| Error::from(ExecutorError::from(e)))?;
    let executor = WorkspaceExecutor::new(
        &settings.directory,
        Duration::from_secs(settings.command_timeout_secs),
    )?;

    let agent = factory.create(AgentContext {
        model_name: settings.model.clone(),
        backend,
        memory,
        limits: settings.limits,
        recall_limit: settings.recall_limit,
    });

    info!(
        agent = %settings.agent_kind,
        model = %settings.model,
        directory = %settings.directory.display(),
        "Agent materialized"
    );
    Ok(AgentController::new(agent, Arc::new(executor)).with_max_iterations(settings.max_iterations))
}
