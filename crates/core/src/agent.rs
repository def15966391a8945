//! The agent trait, a pluggable control-step strategy, and its per-turn state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::backend::{Backend, BackgroundProcess};
use crate::error::Result;
use crate::memory::LongTermMemory;
use crate::observation::Observation;

/// Opening words of the thought in which an agent restates its task before
/// its first live decision.
pub const TASK_RESTATEMENT: &str = "OK, my task is to";

/// Size bounds for an agent's monologue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonologueLimits {
    /// Longest `output` argument stored before truncation (characters).
    pub max_output_length: usize,

    /// Total serialized length above which the monologue is condensed.
    pub max_length: usize,

    /// Number of most recent events condensation keeps verbatim.
    pub keep_recent: usize,
}

impl Default for MonologueLimits {
    fn default() -> Self {
        Self {
            max_output_length: 5_000,
            max_length: 20_000,
            keep_recent: 8,
        }
    }
}

/// Lifecycle of a control-step strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    /// No history yet; the next step seeds it.
    Uninitialized,
    /// Bootstrap history injected, no live decision made yet.
    Seeded,
    Running,
    /// A `finish` action was produced. Terminal until `reset()`.
    Complete,
}

/// What the control loop hands the agent each turn.
#[derive(Debug, Clone, Default)]
pub struct State {
    /// Actions taken and what they produced since the last step. Externally
    /// originated observations (a user's chat message) have no action.
    pub updated_info: Vec<(Option<Action>, Observation)>,

    /// Commands running in the background right now.
    pub background_processes: Vec<BackgroundProcess>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action and the observation it produced.
    pub fn record(&mut self, action: Action, observation: Observation) {
        self.updated_info.push((Some(action), observation));
    }

    /// Record an observation that no agent action caused.
    pub fn record_external(&mut self, observation: Observation) {
        self.updated_info.push((None, observation));
    }

    /// Drop pending pairs that came from agent actions, keeping only
    /// externally originated observations.
    pub fn retain_external(&mut self) {
        self.updated_info.retain(|(action, _)| action.is_none());
    }

    /// Take every pending pair, leaving the batch empty.
    pub fn take_updates(&mut self) -> Vec<(Option<Action>, Observation)> {
        std::mem::take(&mut self.updated_info)
    }
}

/// Everything a factory needs to build an agent.
#[derive(Clone)]
pub struct AgentContext {
    pub model_name: String,
    pub backend: Arc<dyn Backend>,
    /// The long-term memory the agent owns for its lifetime.
    pub memory: Arc<dyn LongTermMemory>,
    pub limits: MonologueLimits,
    /// Maximum fragments returned by a `recall`.
    pub recall_limit: usize,
}

/// A control-step strategy.
///
/// Strategies are selected by name through the
/// [`AgentRegistry`](crate::registry::AgentRegistry).
#[async_trait]
pub trait Agent: Send + Sync {
    fn model_name(&self) -> &str;

    fn instruction(&self) -> &str;

    /// Set the task. Called once per task, before the first step.
    fn set_instruction(&mut self, instruction: String);

    fn phase(&self) -> AgentPhase;

    fn is_complete(&self) -> bool {
        self.phase() == AgentPhase::Complete
    }

    /// The most recent action `step` returned.
    fn latest_action(&self) -> Option<&Action>;

    /// Fold `state` into history and decide the next action.
    async fn step(&mut self, state: &mut State) -> Result<Action>;

    /// Search the agent's long-term memory.
    async fn search_memory(&self, query: &str) -> Result<Vec<String>>;

    /// Return to a pristine, instruction-less state.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let limits = MonologueLimits::default();
        assert_eq!(limits.max_output_length, 5_000);
        assert_eq!(limits.max_length, 20_000);
    }

    #[test]
    fn take_updates_empties_the_batch() {
        let mut state = State::new();
        state.record(Action::run("ls"), Observation::null());
        state.record_external(Observation::UserMessage { message: "hi".into() });

        let batch = state.take_updates();
        assert_eq!(batch.len(), 2);
        assert!(batch[1].0.is_none());
        assert!(state.updated_info.is_empty());
    }
}
