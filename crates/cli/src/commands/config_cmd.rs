//! `devloop config`: Configuration management commands.

use devloop_config::AppConfig;

pub fn default() {
    print!("{}", AppConfig::default_toml());
}

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let has_key = config.api_key.take().is_some();
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    if has_key {
        println!("# api_key is set (hidden)");
    }
    Ok(())
}

pub fn path() {
    println!("{}", config_path().display());
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", config_path().display());

    let config = AppConfig::load()?;
    println!("   Config parsed successfully");
    if !config.has_api_key() {
        println!("   Warning: no API key set (DEVLOOP_API_KEY or OPENAI_API_KEY)");
    }

    let registry = devloop_agent::default_registry()?;
    if !registry.contains(&config.default_agent) {
        return Err(format!("default_agent '{}' is not a registered agent kind", config.default_agent).into());
    }

    println!();
    println!("   Agent:     {}", config.default_agent);
    println!("   Model:     {}", config.default_model);
    println!("   Backend:   {}", config.api_url);
    println!("   Workspace: {}", config.workspace_dir.display());
    println!("   Memory:    {}", config.memory.backend);
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    Ok(())
}

fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}
