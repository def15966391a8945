//! One client connection and the agent behind it.
//!
//! A session moves through four states:
//!
//! - **Connecting**: the controller is being built (or the last build failed)
//! - **Ready**: a controller exists and no task is running
//! - **TaskRunning**: the run loop owns the controller
//! - **Closed**: the transport went away
//!
//! The controller is built in the background so the connection can answer
//! messages immediately. While a task runs, the loop task owns the
//! controller and hands it back when the task ends.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devloop_agent::{AgentController, TaskOutcome, build_controller};
use devloop_config::{AppConfig, SessionOverrides, SessionSettings};
use devloop_core::{AgentRegistry, Backend, Error, Event, Observation, Result};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::message::{ClientMessage, NO_AGENT, ServerMessage};

/// How long a cancelled task gets to reach a safe point on disconnect.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

const EVENT_BUFFER: usize = 256;
const INBOUND_BUFFER: usize = 32;

const INBOX_FULL: &str = "Task inbox full; message not delivered";
const TASK_ENDING: &str = "Task is ending; message not delivered";

/// A bidirectional message channel to one client.
#[async_trait]
pub trait Transport: Send {
    /// Next decoded message. `None` once the client is gone; `Err` for a
    /// frame that could not be decoded.
    async fn recv(&mut self) -> Option<Result<Value>>;

    async fn send(&mut self, message: &ServerMessage) -> Result<()>;
}

/// Everything a session needs to build its controller.
pub struct SessionContext {
    pub config: AppConfig,
    pub registry: Arc<AgentRegistry>,
    pub backend: Arc<dyn Backend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Ready,
    TaskRunning,
    Closed,
}

type TaskResult = (AgentController, Result<TaskOutcome>);

struct RunningTask {
    handle: JoinHandle<TaskResult>,
    inbound: mpsc::Sender<Observation>,
    cancel: CancellationToken,
}

impl RunningTask {
    fn abort(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

pub struct Session<T: Transport> {
    id: String,
    transport: T,
    context: Arc<SessionContext>,
    state: SessionState,
    controller: Option<AgentController>,
    building: Option<JoinHandle<Result<AgentController>>>,
    task: Option<RunningTask>,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, context: Arc<SessionContext>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transport,
            context,
            state: SessionState::Connecting,
            controller: None,
            building: None,
            task: None,
            events_tx,
            events_rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve the connection until the client goes away.
    pub async fn run(mut self) -> SessionState {
        info!(session_id = %self.id, "Session opened");
        if let Some(settings) = self.settings_for(&SessionOverrides::default()).await {
            self.materialize(settings);
        }

        loop {
            tokio::select! {
                incoming = self.transport.recv() => match incoming {
                    None => break,
                    Some(Err(e)) => self.reply_error(&e).await,
                    Some(Ok(value)) => self.dispatch(value).await,
                },
                built = join(self.building.as_mut()) => {
                    self.building = None;
                    self.on_built(built).await;
                }
                finished = join(self.task.as_mut().map(|t| &mut t.handle)) => {
                    self.task = None;
                    self.on_task_finished(finished).await;
                }
                Some(event) = self.events_rx.recv() => {
                    self.send(ServerMessage::Event(event)).await;
                }
            }
        }

        self.close().await;
        self.state
    }

    async fn dispatch(&mut self, value: Value) {
        let message = match ClientMessage::parse(value) {
            Ok(message) => message,
            Err(e) => return self.reply_error(&e).await,
        };
        debug!(session_id = %self.id, action = %message.action, "Client message");

        match message.action.as_str() {
            "initialize" => self.initialize(message).await,
            "start" => self.start(message).await,
            "chat" => self.chat(message).await,
            other => {
                let reply = if self.controller.is_none() && self.task.is_none() {
                    NO_AGENT.to_string()
                } else {
                    format!("Unsupported action: {other}")
                };
                self.send(ServerMessage::error(reply)).await;
            }
        }
    }

    async fn initialize(&mut self, message: ClientMessage) {
        let overrides: SessionOverrides = match serde_json::from_value(Value::Object(message.args)) {
            Ok(overrides) => overrides,
            Err(e) => {
                let err = Error::MalformedClientMessage(format!("Invalid initialize arguments: {e}"));
                return self.reply_error(&err).await;
            }
        };

        let Some(settings) = self.settings_for(&overrides).await else {
            return;
        };

        if let Some(task) = self.task.take() {
            info!(session_id = %self.id, "Re-initializing; cancelling the running task");
            task.abort();
        }
        if let Some(building) = self.building.take() {
            building.abort();
        }
        self.controller = None;
        self.state = SessionState::Connecting;

        self.materialize(settings);
    }

    async fn settings_for(&mut self, overrides: &SessionOverrides) -> Option<SessionSettings> {
        match self.context.config.session_settings(overrides) {
            Ok(settings) => Some(settings),
            Err(e) => {
                self.reply_error(&Error::from(e)).await;
                None
            }
        }
    }

    /// Build the controller in the background.
    fn materialize(&mut self, settings: SessionSettings) {
        let context = self.context.clone();
        info!(
            session_id = %self.id,
            agent = %settings.agent_kind,
            model = %settings.model,
            directory = %settings.directory.display(),
            "Building agent"
        );

        self.building = Some(tokio::spawn(async move {
            let memory = devloop_memory::build_from_config(&context.config.memory);
            build_controller(&context.registry, &settings, context.backend.clone(), memory).await
        }));
    }

    async fn on_built(&mut self, built: std::result::Result<Result<AgentController>, JoinError>) {
        match built {
            Ok(Ok(controller)) => {
                self.controller = Some(controller);
                self.state = SessionState::Ready;
                info!(session_id = %self.id, "Agent ready");
                self.send(ServerMessage::initialized()).await;
            }
            Ok(Err(e)) => {
                warn!(session_id = %self.id, error = %e, "Failed to build agent");
                self.reply_error(&e).await;
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Agent build task failed");
                self.reply_error(&Error::Internal(e.to_string())).await;
            }
        }
    }

    async fn start(&mut self, message: ClientMessage) {
        let task = match message.required_arg("task") {
            Ok(task) => task.to_string(),
            Err(e) => return self.reply_error(&e).await,
        };
        if self.task.is_some() {
            return self.send(ServerMessage::error("A task is already running")).await;
        }
        let Some(mut controller) = self.controller.take() else {
            return self.send(ServerMessage::error(NO_AGENT)).await;
        };

        self.send(ServerMessage::info("Starting new task...")).await;

        let (inbound, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let cancel = CancellationToken::new();
        let outbound = self.events_tx.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let outcome = controller.start_loop(task, inbound_rx, outbound, token).await;
            (controller, outcome)
        });

        self.task = Some(RunningTask {
            handle,
            inbound,
            cancel,
        });
        self.state = SessionState::TaskRunning;
    }

    async fn chat(&mut self, message: ClientMessage) {
        let text = match message.message.clone() {
            Some(text) => text,
            None => match message.required_arg("message") {
                Ok(text) => text.to_string(),
                Err(e) => return self.reply_error(&e).await,
            },
        };
        let observation = Observation::UserMessage { message: text };

        if let Some(task) = &self.task {
            let reply = match task.inbound.try_send(observation) {
                Ok(()) => return,
                Err(TrySendError::Full(_)) => INBOX_FULL,
                Err(TrySendError::Closed(_)) => TASK_ENDING,
            };
            warn!(session_id = %self.id, reason = reply, "Chat message not delivered");
            self.send(ServerMessage::error(reply)).await;
        } else if let Some(controller) = self.controller.as_mut() {
            controller.add_observation(observation);
        } else {
            self.send(ServerMessage::error(NO_AGENT)).await;
        }
    }

    async fn on_task_finished(&mut self, finished: std::result::Result<TaskResult, JoinError>) {
        // Events the loop queued before returning go out first.
        while let Ok(event) = self.events_rx.try_recv() {
            self.send(ServerMessage::Event(event)).await;
        }

        let (controller, outcome) = match finished {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Task panicked; agent lost");
                self.state = SessionState::Connecting;
                return self.reply_error(&Error::Internal(e.to_string())).await;
            }
        };
        self.controller = Some(controller);
        self.state = SessionState::Ready;

        match outcome {
            Ok(TaskOutcome::Finished) => info!(session_id = %self.id, "Task finished"),
            Ok(TaskOutcome::Cancelled) => info!(session_id = %self.id, "Task cancelled"),
            Ok(TaskOutcome::IterationLimit) => {
                self.send(ServerMessage::info("Task stopped after reaching the iteration limit."))
                    .await;
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Task failed");
                self.reply_error(&e).await;
            }
        }
    }

    async fn close(&mut self) {
        if let Some(building) = self.building.take() {
            building.abort();
        }
        if let Some(mut task) = self.task.take() {
            task.cancel.cancel();
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut task.handle).await {
                Ok(Ok((_, outcome))) => debug!(session_id = %self.id, ?outcome, "Task stopped"),
                Ok(Err(e)) => warn!(session_id = %self.id, error = %e, "Task ended abnormally"),
                Err(_) => {
                    warn!(session_id = %self.id, "Task ignored cancellation; aborting");
                    task.handle.abort();
                }
            }
        }
        self.controller = None;
        self.state = SessionState::Closed;
        info!(session_id = %self.id, "Session closed");
    }

    async fn reply_error(&mut self, error: &Error) {
        let message = match error {
            Error::MalformedClientMessage(reason) => reason.clone(),
            other => other.to_string(),
        };
        self.send(ServerMessage::error(message)).await;
    }

    async fn send(&mut self, message: ServerMessage) {
        if let Err(e) = self.transport.send(&message).await {
            debug!(session_id = %self.id, error = %e, "Failed to send to client");
        }
    }
}

/// Await an optional join handle; pends forever when there is none.
async fn join<R>(handle: Option<&mut JoinHandle<R>>) -> std::result::Result<R, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
