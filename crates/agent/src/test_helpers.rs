//! Shared test doubles for agent and controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use devloop_core::{
    Action, ActionRequest, AgentContext, Backend, BackendError, BackgroundProcess, Conversation,
    Event, Executor, ExecutorError, MonologueLimits, Observation,
};
use devloop_memory::InMemoryStore;

/// A backend that replays scripted decisions in order.
///
/// Once the script runs out every call answers `finish`. Each call's
/// conversation is recorded for inspection.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Option<ActionRequest>>>,
    summary: Option<Vec<ActionRequest>>,
    seen: Mutex<Vec<Vec<Event>>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Option<ActionRequest>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            summary: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answer `summarize` with `entries` instead of failing.
    pub fn with_summary(mut self, entries: Vec<ActionRequest>) -> Self {
        self.summary = Some(entries);
        self
    }

    /// Conversations passed to `request_action`, oldest call first.
    pub fn seen(&self) -> Vec<Vec<Event>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn request_action(
        &self,
        _instruction: &str,
        conversation: Conversation<'_>,
        _model: &str,
        _background_processes: &[BackgroundProcess],
    ) -> Result<Option<ActionRequest>, BackendError> {
        self.seen.lock().unwrap().push(conversation.as_slice().to_vec());
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| Some(request("finish", serde_json::json!({})))))
    }

    async fn summarize(
        &self,
        _conversation: Conversation<'_>,
        _model: &str,
    ) -> Result<Vec<ActionRequest>, BackendError> {
        self.summary
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("no scripted summary".into()))
    }
}

/// A backend whose decision never arrives.
pub struct PendingBackend;

#[async_trait]
impl Backend for PendingBackend {
    fn name(&self) -> &str {
        "pending"
    }

    async fn request_action(
        &self,
        _instruction: &str,
        _conversation: Conversation<'_>,
        _model: &str,
        _background_processes: &[BackgroundProcess],
    ) -> Result<Option<ActionRequest>, BackendError> {
        std::future::pending().await
    }
}

/// An executor that records every action and answers `ok`, or fails
/// commands listed in `failing`.
#[derive(Default)]
pub struct MockExecutor {
    pub executed: Mutex<Vec<Action>>,
    pub failing: Vec<String>,
}

#[async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, action: &Action) -> Result<Observation, ExecutorError> {
        self.executed.lock().unwrap().push(action.clone());
        if let Action::Run { command, .. } = action
            && self.failing.contains(command)
        {
            return Err(ExecutorError::ExecutionFailed(format!("{command}: exploded")));
        }
        Ok(Observation::Output { content: "ok".into() })
    }

    async fn background_processes(&self) -> Vec<BackgroundProcess> {
        vec![]
    }
}

pub fn request(action: &str, args: serde_json::Value) -> ActionRequest {
    serde_json::from_value(serde_json::json!({ "action": action, "args": args })).unwrap()
}

pub fn context(backend: Arc<dyn Backend>) -> AgentContext {
    AgentContext {
        model_name: "test-model".into(),
        backend,
        memory: Arc::new(InMemoryStore::new()),
        limits: MonologueLimits::default(),
        recall_limit: 10,
    }
}
