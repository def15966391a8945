//! Shell commands: foreground with a timeout, or detached in the
//! background and tracked by id until killed.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use devloop_core::{BackgroundProcess, ExecutorError, Observation};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct BackgroundCommand {
    command: String,
    child: Child,
}

pub struct ShellRunner {
    root: PathBuf,
    timeout: Duration,
    next_id: AtomicU64,
    background: Mutex<BTreeMap<u64, BackgroundCommand>>,
}

fn shell(command: &str) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };
    cmd.kill_on_drop(true);
    cmd
}

impl ShellRunner {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
            next_id: AtomicU64::new(1),
            background: Mutex::new(BTreeMap::new()),
        }
    }

    /// Run `command` to completion in the workspace.
    pub async fn run(&self, command: &str) -> Result<Observation, ExecutorError> {
        debug!(command, "Executing shell command");

        let output = shell(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ExecutorError::Timeout {
                command: command.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let error = !output.status.success();

        let content = if error {
            let code = output.status.code().unwrap_or(-1);
            warn!(command, exit_code = code, "Command failed");
            if stderr.trim().is_empty() { stdout } else { stderr }
        } else if stderr.is_empty() {
            stdout
        } else {
            format!("{stdout}\n[stderr]: {stderr}")
        };

        Ok(Observation::CmdOutput {
            command_id: None,
            command: command.to_string(),
            content: content.trim().to_string(),
            error,
        })
    }

    /// Start `command` detached and return immediately.
    pub async fn spawn_background(&self, command: &str) -> Result<Observation, ExecutorError> {
        let child = shell(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        info!(id, command, "Started background command");
        self.background.lock().await.insert(
            id,
            BackgroundCommand {
                command: command.to_string(),
                child,
            },
        );

        Ok(Observation::CmdOutput {
            command_id: Some(id),
            command: command.to_string(),
            content: format!("Background command started with id {id}."),
            error: false,
        })
    }

    pub async fn kill(&self, id: u64) -> Result<Observation, ExecutorError> {
        let mut entry = self
            .background
            .lock()
            .await
            .remove(&id)
            .ok_or(ExecutorError::UnknownProcess(id))?;

        // Already exited is fine; anything else is reported.
        if let Err(e) = entry.child.kill().await {
            warn!(id, error = %e, "Failed to kill background command");
        }
        info!(id, command = %entry.command, "Killed background command");

        Ok(Observation::CmdOutput {
            command_id: Some(id),
            command: entry.command,
            content: format!("Background command {id} killed."),
            error: false,
        })
    }

    /// Live background commands, in id order. Commands that exited on
    /// their own are dropped from the table.
    pub async fn background_processes(&self) -> Vec<BackgroundProcess> {
        let mut table = self.background.lock().await;
        table.retain(|id, entry| match entry.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                debug!(id, %status, "Background command exited");
                false
            }
            Err(_) => false,
        });
        table
            .iter()
            .map(|(id, entry)| BackgroundProcess {
                id: *id,
                command: entry.command.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(dir: &tempfile::TempDir) -> ShellRunner {
        ShellRunner::new(dir.path(), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn execute_echo() {
        let dir = tempfile::tempdir().unwrap();
        let obs = runner(&dir).run("echo hello").await.unwrap();
        assert!(!obs.is_error());
        assert_eq!(obs.content(), "hello");
    }

    #[tokio::test]
    async fn runs_in_workspace_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let obs = runner(&dir).run("ls").await.unwrap();
        assert!(obs.content().contains("marker.txt"));
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let obs = runner(&dir).run("cat missing.txt").await.unwrap();
        assert!(obs.is_error());
        assert!(obs.content().contains("missing.txt"));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner::new(dir.path(), Duration::from_millis(100));
        let err = runner.run("sleep 5").await.unwrap_err();
        assert!(matches!(err, ExecutorError::Timeout { .. }));
    }

    #[tokio::test]
    async fn background_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(&dir);

        let obs = runner.spawn_background("sleep 30").await.unwrap();
        let Observation::CmdOutput { command_id: Some(id), .. } = obs else {
            panic!("expected a command id");
        };

        let listed = runner.background_processes().await;
        assert_eq!(listed, vec![BackgroundProcess { id, command: "sleep 30".into() }]);

        runner.kill(id).await.unwrap();
        assert!(runner.background_processes().await.is_empty());
    }

    #[tokio::test]
    async fn ids_increase() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(&dir);
        runner.spawn_background("sleep 30").await.unwrap();
        runner.spawn_background("sleep 30").await.unwrap();
        let ids: Vec<u64> = runner.background_processes().await.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn killing_unknown_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(&dir).kill(42).await.unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownProcess(42)));
    }
}
