//! # devloop core
//!
//! Domain types, traits, and error definitions for the devloop agent runtime.
//! This crate has **no framework dependencies**: it defines the event model,
//! the action/observation sum types, and the seams (backend, executor,
//! long-term memory, agent) that the other crates implement against.
//!
//! ## Layout
//!
//! - [`event`] - the `{action, args}` record that makes up an agent's history
//! - [`action`] / [`observation`] - closed variants with total wire mappings
//! - [`backend`] - the language-model collaborator that picks the next action
//! - [`executor`] - the collaborator that carries actions out
//! - [`memory`] - long-term, text-searchable memory
//! - [`agent`] - the control-step strategy trait and per-turn state
//! - [`registry`] - name → strategy lookup, built once at startup

pub mod error;
pub mod event;
pub mod action;
pub mod observation;
pub mod backend;
pub mod executor;
pub mod memory;
pub mod agent;
pub mod registry;

// Re-export key types at crate root for ergonomics
pub use error::{BackendError, Error, ExecutorError, MemoryError, Result};
pub use event::{Conversation, Event, EventKind};
pub use action::Action;
pub use observation::Observation;
pub use backend::{ActionRequest, Backend, BackgroundProcess};
pub use executor::Executor;
pub use memory::LongTermMemory;
pub use agent::{Agent, AgentContext, AgentPhase, MonologueLimits, State, TASK_RESTATEMENT};
pub use registry::{AgentFactory, AgentRegistry};
