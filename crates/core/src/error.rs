//! Error types for the devloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The top-level [`Error`] carries the control-loop taxonomy; each
//! collaborator (backend, executor, memory) has its own bounded error.

use thiserror::Error;

/// The top-level error type for all devloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Control step ---
    #[error("Instruction must be provided before the agent can step")]
    MissingInstruction,

    #[error("Unknown action kind: '{0}'")]
    UnknownActionKind(String),

    #[error("Unknown observation kind: '{0}'")]
    UnknownObservationKind(String),

    #[error("Invalid arguments for '{kind}' action: {reason}")]
    InvalidActionArgs { kind: String, reason: String },

    #[error("Condensation did not shrink the monologue ({before} -> {after})")]
    CondensationIneffective { before: usize, after: usize },

    #[error("Agent has already finished its task")]
    AgentComplete,

    // --- Registry ---
    #[error("Agent kind already registered under '{0}'")]
    DuplicateRegistration(String),

    #[error("No agent kind registered under '{0}'")]
    UnknownAgentKind(String),

    // --- Client protocol ---
    #[error("Malformed client message: {0}")]
    MalformedClientMessage(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    // --- Collaborators ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Contract violations inside the control step. These end the current
    /// task; continuing would corrupt the monologue.
    pub fn is_task_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownActionKind(_)
                | Self::UnknownObservationKind(_)
                | Self::InvalidActionArgs { .. }
                | Self::CondensationIneffective { .. }
                | Self::MissingInstruction
                | Self::Backend(_)
        )
    }

    /// Protocol errors that are reported back to the client while the
    /// connection and agent stay intact.
    pub fn is_client_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedClientMessage(_)
                | Self::MissingRequiredField(_)
                | Self::UnknownAgentKind(_)
                | Self::Config { .. }
        )
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timed out after {timeout_secs}s: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("Path escapes the workspace: {0}")]
    PathOutsideWorkspace(String),

    #[error("No background process with id {0}")]
    UnknownProcess(u64),

    #[error("Action is not executable here: {0}")]
    NotExecutable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Indexing failed: {0}")]
    Indexing(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}
