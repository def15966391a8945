//! Agent registry: name → strategy lookup.
//!
//! Built once at startup and shared (behind an `Arc`) with whatever creates
//! sessions. Bindings are permanent: there is no unregister, and a second
//! registration under an existing name is rejected.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::agent::{Agent, AgentContext};
use crate::error::{Error, Result};

/// Builds agents of one kind.
pub trait AgentFactory: Send + Sync {
    fn create(&self, context: AgentContext) -> Box<dyn Agent>;
}

impl<F> AgentFactory for F
where
    F: Fn(AgentContext) -> Box<dyn Agent> + Send + Sync,
{
    fn create(&self, context: AgentContext) -> Box<dyn Agent> {
        self(context)
    }
}

#[derive(Default)]
pub struct AgentRegistry {
    factories: HashMap<String, Arc<dyn AgentFactory>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `factory`. Fails if the name is already bound; the
    /// existing binding is left in place.
    pub fn register(&mut self, name: impl Into<String>, factory: impl AgentFactory + 'static) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::DuplicateRegistration(name));
        }
        info!(agent = %name, "Registered agent kind");
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn AgentFactory>> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAgentKind(name.to_string()))
    }

    /// Build a new agent of kind `name`.
    pub fn create(&self, name: &str, context: AgentContext) -> Result<Box<dyn Agent>> {
        Ok(self.get(name)?.create(context))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered kinds, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
