//! Executor trait: the collaborator that carries actions out.
//!
//! The control step only decides and records actions. Running a command,
//! touching the filesystem, or fetching a page happens behind this trait,
//! after the step has returned.

use async_trait::async_trait;

use crate::action::Action;
use crate::backend::BackgroundProcess;
use crate::error::ExecutorError;
use crate::observation::Observation;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run `action` and report what happened.
    ///
    /// Only `Run`, `Kill`, `BrowseUrl`, `FileRead` and `FileWrite` are
    /// executable; other variants yield [`ExecutorError::NotExecutable`].
    async fn execute(&self, action: &Action) -> Result<Observation, ExecutorError>;

    /// Commands currently running in the background.
    async fn background_processes(&self) -> Vec<BackgroundProcess>;
}
