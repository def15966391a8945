//! The run loop: step the agent, carry out what it decides, feed the
//! result back, and repeat until it finishes.
//!
//! The loop owns the agent for the duration of a task. Everything else
//! talks to it through two channels: user observations come in on
//! `inbound`, every action and observation goes out on `outbound`.

use std::sync::Arc;

use devloop_core::{Action, Agent, AgentPhase, Event, Executor, Observation, Result, State};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a task ended, short of a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Finished,
    Cancelled,
    IterationLimit,
}

pub struct AgentController {
    agent: Box<dyn Agent>,
    executor: Arc<dyn Executor>,
    state: State,
    max_iterations: u32,
}

impl AgentController {
    pub fn new(agent: Box<dyn Agent>, executor: Arc<dyn Executor>) -> Self {
        Self {
            agent,
            executor,
            state: State::new(),
            max_iterations: 100,
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn agent(&self) -> &dyn Agent {
        self.agent.as_ref()
    }

    /// Queue an observation for the next task's first turn.
    pub fn add_observation(&mut self, observation: Observation) {
        self.state.record_external(observation);
    }

    /// Run `task` to completion.
    pub async fn start_loop(
        &mut self,
        task: String,
        mut inbound: mpsc::Receiver<Observation>,
        outbound: mpsc::Sender<Event>,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome> {
        // Every task starts from a freshly seeded agent, however the last
        // one ended. Queued user messages survive; the old task's pending
        // results do not.
        if self.agent.phase() != AgentPhase::Uninitialized {
            self.agent.reset();
            self.state.retain_external();
        }
        info!(task = %task, model = self.agent.model_name(), "Starting task");
        self.agent.set_instruction(task);

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                info!(iteration, "Task cancelled");
                return Ok(TaskOutcome::Cancelled);
            }

            while let Ok(observation) = inbound.try_recv() {
                forward(&outbound, observation.to_event()).await;
                self.state.record_external(observation);
            }
            self.state.background_processes = self.executor.background_processes().await;

            let action = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(iteration, "Task cancelled while waiting for a decision");
                    return Ok(TaskOutcome::Cancelled);
                }
                action = self.agent.step(&mut self.state) => action?,
            };

            debug!(iteration, kind = %action.kind(), "Agent decided");
            forward(&outbound, action.to_event()).await;

            if action == Action::Finish {
                info!(iteration, "Task finished");
                return Ok(TaskOutcome::Finished);
            }

            let observation = self.perform(&action).await;
            forward(&outbound, observation.to_event()).await;
            self.state.record(action, observation);
        }

        warn!(max_iterations = self.max_iterations, "Task hit the iteration limit");
        Ok(TaskOutcome::IterationLimit)
    }

    /// Carry out `action`. Failures become observations so the agent can
    /// see them and recover.
    async fn perform(&self, action: &Action) -> Observation {
        match action {
            Action::Think { .. } | Action::Finish => Observation::null(),
            Action::Recall { query } => match self.agent.search_memory(query).await {
                Ok(memories) => Observation::Recall {
                    query: query.clone(),
                    memories,
                },
                Err(e) => Observation::Output {
                    content: format!("Error: {e}"),
                },
            },
            _ => match self.executor.execute(action).await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!(kind = %action.kind(), error = %e, "Action failed");
                    match action {
                        Action::Run { command, .. } => Observation::CmdOutput {
                            command_id: None,
                            command: command.clone(),
                            content: e.to_string(),
                            error: true,
                        },
                        Action::Kill { id } => Observation::CmdOutput {
                            command_id: Some(*id),
                            command: String::new(),
                            content: e.to_string(),
                            error: true,
                        },
                        _ => Observation::Output {
                            content: format!("Error: {e}"),
                        },
                    }
                }
            },
        }
    }
}

async fn forward(outbound: &mpsc::Sender<Event>, event: Event) {
    if outbound.send(event).await.is_err() {
        debug!("Event receiver dropped");
    }
}
