//! `devloop run`: Run one task headless.
//!
//! Every event the agent records is printed to stdout as one JSON line.
//! Ctrl+C cancels the task at the next safe point.

use std::path::PathBuf;

use devloop_agent::{TaskOutcome, build_controller};
use devloop_config::{AppConfig, SessionOverrides};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct RunArgs {
    pub task: String,
    pub agent: Option<String>,
    pub model: Option<String>,
    pub directory: Option<PathBuf>,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set DEVLOOP_API_KEY (or OPENAI_API_KEY), or add `api_key` to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let overrides = SessionOverrides {
        directory: args.directory,
        agent_cls: args.agent,
        model: args.model,
        ..SessionOverrides::default()
    };
    let settings = config.session_settings(&overrides)?;
    let registry = devloop_agent::default_registry()?;
    let backend = devloop_providers::build_from_config(&config)?;
    let memory = devloop_memory::build_from_config(&config.memory);
    let mut controller = build_controller(&registry, &settings, backend, memory).await?;

    let (_inbound, inbound_rx) = mpsc::channel(1);
    let (events_tx, mut events_rx) = mpsc::channel(256);
    let cancel = CancellationToken::new();

    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("  [Error] could not encode event: {e}"),
            }
        }
    });

    let outcome = controller
        .start_loop(args.task, inbound_rx, events_tx, cancel)
        .await;
    printer.await?;

    match outcome? {
        TaskOutcome::Finished => info!("Task finished"),
        TaskOutcome::Cancelled => eprintln!("  Task cancelled"),
        TaskOutcome::IterationLimit => {
            eprintln!("  Task stopped after {} iterations", settings.max_iterations);
        }
    }

    Ok(())
}
