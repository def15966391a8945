//! The agent kinds this crate provides.

use devloop_core::{Agent, AgentContext, AgentRegistry, Result};

use crate::monologue_agent::MonologueAgent;

pub const MONOLOGUE_AGENT: &str = "MonologueAgent";

/// A registry with every built-in agent kind bound.
pub fn default_registry() -> Result<AgentRegistry> {
    let mut registry = AgentRegistry::new();
    registry.register(MONOLOGUE_AGENT, |context: AgentContext| {
        Box::new(MonologueAgent::new(context)) as Box<dyn Agent>
    })?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedBackend, context};
    use devloop_core::Error;
    use std::sync::Arc;

    #[test]
    fn monologue_agent_is_registered() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.names(), vec![MONOLOGUE_AGENT.to_string()]);

        let agent = registry
            .create(MONOLOGUE_AGENT, context(Arc::new(ScriptedBackend::new(vec![]))))
            .unwrap();
        assert_eq!(agent.model_name(), "test-model");
    }

    #[test]
    fn second_registration_keeps_the_first() {
        let mut registry = default_registry().unwrap();
        let err = registry
            .register(MONOLOGUE_AGENT, |context: AgentContext| {
                Box::new(MonologueAgent::new(context)) as Box<dyn Agent>
            })
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRegistration(_)));
        assert_eq!(registry.len(), 1);
    }
}
