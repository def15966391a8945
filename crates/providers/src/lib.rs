//! Language-model backends for devloop.
//!
//! All backends implement the `devloop_core::Backend` trait.

pub mod openai_compat;
pub mod prompt;

use std::sync::Arc;

use devloop_config::AppConfig;
use devloop_core::{Backend, BackendError};

pub use openai_compat::OpenAiCompatBackend;

/// Build the backend described by the configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Backend>, BackendError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        BackendError::NotConfigured(
            "No API key. Set api_key in config.toml, DEVLOOP_API_KEY, or OPENAI_API_KEY".into(),
        )
    })?;
    let backend = OpenAiCompatBackend::new("openai", config.api_url.clone(), api_key)?;
    Ok(Arc::new(backend))
}
