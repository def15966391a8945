//! devloop CLI: the main entry point.
//!
//! Commands:
//! - `serve`   - Start the WebSocket gateway
//! - `run`     - Run one task headless, printing each event as JSON
//! - `agents`  - List registered agent kinds
//! - `config`  - Print, inspect, or validate configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "devloop",
    about = "devloop - a monologue-driven coding agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single task and print every event as a JSON line
    Run {
        /// What the agent should do
        #[arg(short, long)]
        task: String,

        /// Agent kind (defaults to the configured agent)
        #[arg(short, long)]
        agent: Option<String>,

        /// Model name passed to the backend
        #[arg(short, long)]
        model: Option<String>,

        /// Workspace directory the agent works in
        #[arg(short, long, env = "WORKSPACE_DIR")]
        directory: Option<PathBuf>,
    },

    /// List registered agent kinds
    Agents,

    /// Configuration commands (prints the default config when no action is given)
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default configuration file
    Default,
    /// Print the effective configuration (API key redacted)
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `run` output stays machine-readable.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Run {
            task,
            agent,
            model,
            directory,
        } => {
            commands::run::run(commands::run::RunArgs {
                task,
                agent,
                model,
                directory,
            })
            .await?
        }
        Commands::Agents => commands::agents::run()?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Default) {
            ConfigAction::Default => commands::config_cmd::default(),
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path(),
            ConfigAction::Validate => commands::config_cmd::validate()?,
        },
    }

    Ok(())
}
