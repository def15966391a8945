//! End-to-end tests for the devloop pipeline.
//!
//! These drive a real agent, controller, workspace executor, and memory
//! store from a task to its final event, with only the language model
//! replaced by a script.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use devloop_agent::{AgentController, TaskOutcome, build_controller, default_registry};
use devloop_config::{AppConfig, SessionOverrides};
use devloop_core::{ActionRequest, Backend, BackendError, BackgroundProcess, Conversation, Event, EventKind};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ── Scripted backend ─────────────────────────────────────────────────────

/// Replays scripted decisions, then answers `finish`.
struct ScriptedBackend {
    decisions: Mutex<VecDeque<ActionRequest>>,
    summary: Option<String>,
    conversation_sizes: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    fn new(decisions: Vec<Value>) -> Self {
        Self {
            decisions: Mutex::new(
                decisions
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap())
                    .collect(),
            ),
            summary: None,
            conversation_sizes: Mutex::new(Vec::new()),
        }
    }

    fn summarizing(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    fn conversation_sizes(&self) -> Vec<usize> {
        self.conversation_sizes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "e2e_script"
    }

    async fn request_action(
        &self,
        _instruction: &str,
        conversation: Conversation<'_>,
        _model: &str,
        _background_processes: &[BackgroundProcess],
    ) -> Result<Option<ActionRequest>, BackendError> {
        self.conversation_sizes.lock().unwrap().push(conversation.len());
        let next = self.decisions.lock().unwrap().pop_front();
        Ok(Some(next.unwrap_or_else(|| {
            serde_json::from_value(json!({"action": "finish"})).unwrap()
        })))
    }

    async fn summarize(
        &self,
        _conversation: Conversation<'_>,
        _model: &str,
    ) -> Result<Vec<ActionRequest>, BackendError> {
        let summary = self
            .summary
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("no summary scripted".into()))?;
        Ok(vec![
            serde_json::from_value(json!({"action": "summarize", "args": {"summary": summary}})).unwrap(),
        ])
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

async fn controller(
    backend: Arc<ScriptedBackend>,
    workspace: &Path,
    overrides: SessionOverrides,
) -> AgentController {
    let config = AppConfig {
        workspace_dir: workspace.to_path_buf(),
        ..AppConfig::default()
    };
    let settings = config.session_settings(&overrides).unwrap();
    let registry = default_registry().unwrap();
    let memory = devloop_memory::build_from_config(&config.memory);
    build_controller(&registry, &settings, backend, memory).await.unwrap()
}

async fn run_task(controller: &mut AgentController, task: &str) -> (TaskOutcome, Vec<Event>) {
    let (_inbound, inbound_rx) = mpsc::channel(4);
    let (events_tx, mut events_rx) = mpsc::channel(1024);
    let outcome = controller
        .start_loop(task.into(), inbound_rx, events_tx, CancellationToken::new())
        .await
        .unwrap();
    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    (outcome, events)
}

fn kinds(events: &[Event]) -> Vec<EventKind> {
    events.iter().map(|e| e.kind).collect()
}

// ── Pipeline ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_write_then_read_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![
        json!({"action": "write", "args": {"file": "notes/todo.txt", "content": "ship it"}}),
        json!({"action": "read", "args": {"file": "notes/todo.txt"}}),
        json!({"action": "finish"}),
    ]));
    let mut controller = controller(backend, dir.path(), SessionOverrides::default()).await;

    let (outcome, events) = run_task(&mut controller, "write a todo note").await;
    assert_eq!(outcome, TaskOutcome::Finished);
    assert_eq!(
        kinds(&events),
        vec![
            EventKind::Write,
            EventKind::Output,
            EventKind::Read,
            EventKind::Output,
            EventKind::Finish,
        ]
    );
    assert_eq!(events[3].arg_str("output"), Some("ship it"));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes/todo.txt")).unwrap(),
        "ship it"
    );
}

#[tokio::test]
async fn e2e_failed_command_is_reported_and_the_task_continues() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![
        json!({"action": "run", "args": {"command": "cat missing.txt"}}),
        json!({"action": "run", "args": {"command": "echo recovered"}}),
        json!({"action": "finish"}),
    ]));
    let mut controller = controller(backend, dir.path(), SessionOverrides::default()).await;

    let (outcome, events) = run_task(&mut controller, "read a file that is not there").await;
    assert_eq!(outcome, TaskOutcome::Finished);
    assert_eq!(events[1].kind, EventKind::Error);
    assert_eq!(events[3].kind, EventKind::Output);
    assert_eq!(events[3].arg_str("output").map(str::trim), Some("recovered"));
}

#[tokio::test]
async fn e2e_recall_finds_earlier_output() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![
        json!({"action": "run", "args": {"command": "echo zebra-launch-code"}}),
        json!({"action": "recall", "args": {"query": "zebra launch code"}}),
        json!({"action": "finish"}),
    ]));
    let mut controller = controller(backend, dir.path(), SessionOverrides::default()).await;

    let (outcome, events) = run_task(&mut controller, "remember the code").await;
    assert_eq!(outcome, TaskOutcome::Finished);

    let recalled = events[3].arg_str("output").unwrap();
    assert!(recalled.contains("zebra-launch-code"), "recall returned: {recalled}");
}

#[tokio::test]
async fn e2e_unknown_action_kind_ends_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![
        json!({"action": "teleport", "args": {}}),
    ]));
    let mut controller = controller(backend, dir.path(), SessionOverrides::default()).await;

    let (outcome, events) = {
        let (_inbound, inbound_rx) = mpsc::channel(4);
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let outcome = controller
            .start_loop("go".into(), inbound_rx, events_tx, CancellationToken::new())
            .await;
        let mut events = Vec::new();
        while let Ok(event) = events_rx.try_recv() {
            events.push(event);
        }
        (outcome, events)
    };

    let err = outcome.unwrap_err();
    assert!(err.is_task_fatal());
    assert!(events.is_empty());
}

#[tokio::test]
async fn e2e_long_task_condenses_the_monologue() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Vec::new();
    for i in 0..12 {
        script.push(json!({"action": "run", "args": {"command": format!("echo step-{i}-{}", "x".repeat(40))}}));
    }
    script.push(json!({"action": "finish"}));
    let backend = Arc::new(ScriptedBackend::new(script).summarizing("Listed files and echoed a few steps."));

    let overrides = SessionOverrides {
        max_monologue_length: Some(3_200),
        ..SessionOverrides::default()
    };
    let mut controller = controller(backend.clone(), dir.path(), overrides).await;

    let (outcome, events) = run_task(&mut controller, "echo a lot").await;
    assert_eq!(outcome, TaskOutcome::Finished);
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::Finish));

    let sizes = backend.conversation_sizes();
    let first = sizes[0];
    assert!(
        sizes.iter().skip(1).any(|&n| n < first),
        "monologue never shrank: {sizes:?}"
    );
}

#[tokio::test]
async fn e2e_workspace_override_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("projects").join("demo");
    let backend = Arc::new(ScriptedBackend::new(vec![
        json!({"action": "run", "args": {"command": "pwd"}}),
    ]));
    let overrides = SessionOverrides {
        directory: Some(nested.clone()),
        ..SessionOverrides::default()
    };
    let mut controller = controller(backend, dir.path(), overrides).await;
    assert!(nested.is_dir());

    let (outcome, events) = run_task(&mut controller, "where am I").await;
    assert_eq!(outcome, TaskOutcome::Finished);
    assert!(events[1].arg_str("output").unwrap().trim().ends_with("demo"));
}

// ── Registry & config ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_unknown_agent_kind_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        workspace_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };
    let overrides = SessionOverrides {
        agent_cls: Some("NoSuchAgent".into()),
        ..SessionOverrides::default()
    };
    let settings = config.session_settings(&overrides).unwrap();
    let registry = default_registry().unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![]));
    let memory = devloop_memory::build_from_config(&config.memory);

    let err = build_controller(&registry, &settings, backend, memory)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, devloop_core::Error::UnknownAgentKind(ref name) if name == "NoSuchAgent"));
}

#[test]
fn e2e_config_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.default_agent, "MonologueAgent");
    assert_eq!(config.default_model, "gpt-4-0125-preview");
    assert_eq!(config.monologue.max_output_length, 5_000);
    assert_eq!(config.monologue.max_length, 20_000);
    assert_eq!(config.controller.max_iterations, 100);
}

// ── Gateway ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_health() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let context = Arc::new(devloop_gateway::SessionContext {
        config: AppConfig::default(),
        registry: Arc::new(default_registry().unwrap()),
        backend: Arc::new(ScriptedBackend::new(vec![])),
    });
    let app = devloop_gateway::build_router(context);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["agents"][0], "MonologueAgent");
}
