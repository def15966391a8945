//! `devloop serve`: Start the WebSocket gateway.

use devloop_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let registry = devloop_agent::default_registry()?;

    eprintln!("devloop gateway");
    eprintln!("   Listening: ws://{}:{}/ws", config.gateway.host, config.gateway.port);
    eprintln!("   Agent:     {}", config.default_agent);
    eprintln!("   Model:     {}", config.default_model);
    eprintln!("   Workspace: {}", config.workspace_dir.display());

    devloop_gateway::start(config, registry).await?;

    Ok(())
}
