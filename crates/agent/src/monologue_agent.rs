//! `MonologueAgent`: the default control-step strategy.
//!
//! The agent keeps one monologue and one long-term memory for its whole
//! life. Each step folds the previous turn's results into the monologue,
//! shows the monologue to the backend, and returns the decoded decision.

use std::sync::Arc;

use async_trait::async_trait;
use devloop_core::{
    Action, Agent, AgentContext, AgentPhase, Backend, Error, Event, LongTermMemory, Result, State,
};
use tracing::{debug, info};

use crate::bootstrap::bootstrap_events;
use crate::condenser::{BackendCondenser, Condenser};
use crate::monologue::Monologue;

/// Thought recorded when the backend has no decision.
pub const NO_DECISION_THOUGHT: &str = "...";

pub struct MonologueAgent {
    model_name: String,
    instruction: String,
    phase: AgentPhase,
    monologue: Monologue,
    memory: Arc<dyn LongTermMemory>,
    backend: Arc<dyn Backend>,
    condenser: Box<dyn Condenser>,
    recall_limit: usize,
    latest_action: Option<Action>,
}

impl MonologueAgent {
    pub fn new(context: AgentContext) -> Self {
        let condenser = BackendCondenser::new(context.backend.clone(), context.model_name.clone());
        Self {
            model_name: context.model_name,
            instruction: String::new(),
            phase: AgentPhase::Uninitialized,
            monologue: Monologue::new(context.limits),
            memory: context.memory,
            backend: context.backend,
            condenser: Box::new(condenser),
            recall_limit: context.recall_limit,
            latest_action: None,
        }
    }

    /// Replace the condenser used when the monologue overflows.
    pub fn with_condenser(mut self, condenser: impl Condenser + 'static) -> Self {
        self.condenser = Box::new(condenser);
        self
    }

    pub fn monologue(&self) -> &Monologue {
        &self.monologue
    }

    /// Record one event in the monologue and in long-term memory, then
    /// condense if the monologue has grown past its ceiling.
    async fn add_event(&mut self, event: Event) -> Result<()> {
        let stored = self.monologue.append(event);
        self.memory.add_event(stored).await;
        if self.monologue.needs_condensation() {
            debug!(total_length = self.monologue.total_length(), "Monologue over ceiling");
            self.monologue.condense(self.condenser.as_ref()).await?;
        }
        Ok(())
    }

    async fn seed(&mut self) -> Result<()> {
        if self.instruction.is_empty() {
            return Err(Error::MissingInstruction);
        }
        for event in bootstrap_events(&self.instruction) {
            self.add_event(event).await?;
        }
        self.phase = AgentPhase::Seeded;
        info!(events = self.monologue.len(), "Seeded monologue");
        Ok(())
    }
}

#[async_trait]
impl Agent for MonologueAgent {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn instruction(&self) -> &str {
        &self.instruction
    }

    fn set_instruction(&mut self, instruction: String) {
        self.instruction = instruction;
    }

    fn phase(&self) -> AgentPhase {
        self.phase
    }

    fn latest_action(&self) -> Option<&Action> {
        self.latest_action.as_ref()
    }

    async fn step(&mut self, state: &mut State) -> Result<Action> {
        match self.phase {
            AgentPhase::Complete => return Err(Error::AgentComplete),
            AgentPhase::Uninitialized => self.seed().await?,
            AgentPhase::Seeded | AgentPhase::Running => {}
        }

        // Observation first, then the action that produced it.
        for (action, observation) in state.take_updates() {
            self.add_event(observation.to_event()).await?;
            if let Some(action) = action {
                self.add_event(action.to_event()).await?;
            }
        }

        let request = self
            .backend
            .request_action(
                &self.instruction,
                self.monologue.as_conversation(),
                &self.model_name,
                &state.background_processes,
            )
            .await?;

        let action = match request {
            Some(request) => Action::from_request(&request)?,
            None => {
                debug!("Backend had no decision");
                Action::think(NO_DECISION_THOUGHT)
            }
        };

        self.phase = if action == Action::Finish {
            AgentPhase::Complete
        } else {
            AgentPhase::Running
        };
        self.latest_action = Some(action.clone());
        Ok(action)
    }

    async fn search_memory(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.memory.search(query, self.recall_limit).await?)
    }

    fn reset(&mut self) {
        self.instruction.clear();
        self.phase = AgentPhase::Uninitialized;
        self.monologue.clear();
        self.latest_action = None;
    }
}
