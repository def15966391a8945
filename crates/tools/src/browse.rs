//! Page fetching for `browse` actions.

use std::time::Duration;

use devloop_core::{ExecutorError, Observation};
use tracing::debug;

pub struct Browser {
    client: reqwest::Client,
}

/// Bare hosts like `example.com` get an `https://` scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

impl Browser {
    pub fn new(timeout: Duration) -> Result<Self, ExecutorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutorError::ExecutionFailed(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<Observation, ExecutorError> {
        let url = normalize_url(url);
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ExecutorError::ExecutionFailed(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        let content = response
            .text()
            .await
            .map_err(|e| ExecutorError::ExecutionFailed(format!("Reading {url} failed: {e}")))?;

        if !status.is_success() {
            return Err(ExecutorError::ExecutionFailed(format!(
                "GET {url} returned {}",
                status.as_u16()
            )));
        }

        Ok(Observation::Browser { url, content })
    }
}
