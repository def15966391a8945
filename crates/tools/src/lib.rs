//! Workspace executor for devloop.
//!
//! [`WorkspaceExecutor`] carries out the executable actions (`run`, `kill`,
//! `browse`, `read`, `write`) against one workspace directory.

pub mod browse;
pub mod files;
pub mod path;
pub mod shell;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use devloop_core::{Action, BackgroundProcess, Executor, ExecutorError, Observation};

pub use browse::Browser;
pub use files::FileAccess;
pub use shell::ShellRunner;

pub struct WorkspaceExecutor {
    shell: ShellRunner,
    files: FileAccess,
    browser: Browser,
}

impl WorkspaceExecutor {
    /// An executor rooted at `root`. Commands and page fetches give up
    /// after `timeout`.
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Result<Self, ExecutorError> {
        let root = root.into();
        Ok(Self {
            shell: ShellRunner::new(root.clone(), timeout),
            files: FileAccess::new(root),
            browser: Browser::new(timeout)?,
        })
    }

    pub fn root(&self) -> &Path {
        self.files.root()
    }
}

#[async_trait]
impl Executor for WorkspaceExecutor {
    async fn execute(&self, action: &Action) -> Result<Observation, ExecutorError> {
        match action {
            Action::Run { command, background: false } => self.shell.run(command).await,
            Action::Run { command, background: true } => self.shell.spawn_background(command).await,
            Action::Kill { id } => self.shell.kill(*id).await,
            Action::BrowseUrl { url } => self.browser.fetch(url).await,
            Action::FileRead { path } => self.files.read(path).await,
            Action::FileWrite { path, content } => self.files.write(path, content).await,
            Action::Recall { .. } | Action::Think { .. } | Action::Finish => {
                Err(ExecutorError::NotExecutable(action.kind().to_string()))
            }
        }
    }

    async fn background_processes(&self) -> Vec<BackgroundProcess> {
        self.shell.background_processes().await
    }
}
