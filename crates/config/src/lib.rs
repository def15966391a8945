//! Configuration loading, validation, and management for devloop.
//!
//! Loads configuration from `~/.devloop/config.toml` with environment
//! variable overrides. Validates all settings at startup. Each session may
//! override the workspace directory, agent kind, model, and monologue
//! limits through [`SessionOverrides`].

use devloop_core::MonologueLimits;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.devloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the language-model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Agent kind used when a session does not name one
    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Model used when a session does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Workspace directory used when a session does not name one
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,

    #[serde(default)]
    pub monologue: MonologueConfig,

    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_agent() -> String {
    "MonologueAgent".into()
}
fn default_model() -> String {
    "gpt-4-0125-preview".into()
}
fn default_workspace_dir() -> PathBuf {
    PathBuf::from("workspace")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_agent", &self.default_agent)
            .field("default_model", &self.default_model)
            .field("workspace_dir", &self.workspace_dir)
            .field("monologue", &self.monologue)
            .field("controller", &self.controller)
            .field("executor", &self.executor)
            .field("memory", &self.memory)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonologueConfig {
    /// Longest stored `output` argument, in characters
    #[serde(default = "default_max_output_length")]
    pub max_output_length: usize,

    /// Serialized length above which the monologue is condensed
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Events kept verbatim by condensation
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
}

fn default_max_output_length() -> usize {
    5_000
}
fn default_max_length() -> usize {
    20_000
}
fn default_keep_recent() -> usize {
    8
}

impl Default for MonologueConfig {
    fn default() -> Self {
        Self {
            max_output_length: default_max_output_length(),
            max_length: default_max_length(),
            keep_recent: default_keep_recent(),
        }
    }
}

impl MonologueConfig {
    pub fn limits(&self) -> MonologueLimits {
        MonologueLimits {
            max_output_length: self.max_output_length,
            max_length: self.max_length,
            keep_recent: self.keep_recent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Turns per task before the loop gives up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    100
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_command_timeout() -> u64 {
    120
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: default_command_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Fragments returned per `recall`
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
}

fn default_memory_backend() -> String {
    "in_memory".into()
}
fn default_recall_limit() -> usize {
    10
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            recall_limit: default_recall_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Per-session overrides sent by a client with `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOverrides {
    #[serde(default)]
    pub directory: Option<PathBuf>,

    #[serde(default)]
    pub agent_cls: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub max_output_length: Option<usize>,

    #[serde(default)]
    pub max_monologue_length: Option<usize>,
}

/// The effective settings for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub directory: PathBuf,
    pub agent_kind: String,
    pub model: String,
    pub limits: MonologueLimits,
    pub recall_limit: usize,
    pub max_iterations: u32,
    pub command_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from the default path (~/.devloop/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `DEVLOOP_API_KEY`, then `OPENAI_API_KEY`
    /// - `DEVLOOP_API_URL`
    /// - `DEVLOOP_AGENT`
    /// - `DEVLOOP_MODEL`
    /// - `WORKSPACE_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("DEVLOOP_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }
        if let Ok(url) = std::env::var("DEVLOOP_API_URL") {
            config.api_url = url;
        }
        if let Ok(agent) = std::env::var("DEVLOOP_AGENT") {
            config.default_agent = agent;
        }
        if let Ok(model) = std::env::var("DEVLOOP_MODEL") {
            config.default_model = model;
        }
        if let Ok(dir) = std::env::var("WORKSPACE_DIR") {
            config.workspace_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".devloop")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_limits(&self.monologue.limits())?;

        if !matches!(self.memory.backend.as_str(), "in_memory" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "memory.backend must be 'in_memory' or 'none', got '{}'",
                self.memory.backend
            )));
        }

        if self.controller.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "controller.max_iterations must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Merge a session's overrides over the defaults.
    pub fn session_settings(&self, overrides: &SessionOverrides) -> Result<SessionSettings, ConfigError> {
        let mut limits = self.monologue.limits();
        if let Some(max) = overrides.max_output_length {
            limits.max_output_length = max;
        }
        if let Some(max) = overrides.max_monologue_length {
            limits.max_length = max;
        }
        validate_limits(&limits)?;

        Ok(SessionSettings {
            directory: overrides
                .directory
                .clone()
                .unwrap_or_else(|| self.workspace_dir.clone()),
            agent_kind: overrides
                .agent_cls
                .clone()
                .unwrap_or_else(|| self.default_agent.clone()),
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            limits,
            recall_limit: self.memory.recall_limit,
            max_iterations: self.controller.max_iterations,
            command_timeout_secs: self.executor.command_timeout_secs,
        })
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn validate_limits(limits: &MonologueLimits) -> Result<(), ConfigError> {
    if limits.max_output_length == 0 {
        return Err(ConfigError::ValidationError(
            "max_output_length must be > 0".into(),
        ));
    }
    if limits.max_length == 0 {
        return Err(ConfigError::ValidationError(
            "monologue max_length must be > 0".into(),
        ));
    }
    Ok(())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_agent: default_agent(),
            default_model: default_model(),
            workspace_dir: default_workspace_dir(),
            monologue: MonologueConfig::default(),
            controller: ControllerConfig::default(),
            executor: ExecutorConfig::default(),
            memory: MemoryConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for devloop_core::Error {
    fn from(e: ConfigError) -> Self {
        devloop_core::Error::Config {
            message: e.to_string(),
        }
    }
}
