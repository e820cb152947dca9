//! Subprocess plumbing: a command description, the runner trait the orchestrator
//! drives, and a handle for processes that outlive a single call.

use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// A program, its arguments, and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes external tools on behalf of the test orchestrator.
pub trait ProcessRunner: Send + Sync {
    /// Runs `command` to completion. A non-zero exit status is an error.
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, Result<()>>;

    /// Starts `command` in the background and returns immediately.
    fn spawn(&self, command: &CommandSpec) -> Result<BackgroundProcess>;
}

/// A process started by [`ProcessRunner::spawn`]. Killed on drop if still running.
#[derive(Debug)]
pub struct BackgroundProcess {
    label: String,
    child: Option<Child>,
}

impl BackgroundProcess {
    pub fn new(label: impl Into<String>, child: Child) -> Self {
        Self {
            label: label.into(),
            child: Some(child),
        }
    }

    /// A handle with no OS process behind it, for runners that serve in-process.
    pub fn detached(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            child: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Whether the OS process has already exited. Handles without a running child report `false`.
    pub fn has_exited(&mut self) -> Result<bool> {
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };
        let status = child
            .try_wait()
            .with_context(|| format!("failed to poll `{}`", self.label))?;
        if let Some(status) = status {
            tracing::debug!(
                target: "orca::process",
                process = %self.label,
                %status,
                "background process exited"
            );
        }
        Ok(status.is_some())
    }

    /// Terminates the process and waits for it to exit. Calling it twice is harmless.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("failed to poll `{}`", self.label))?
        {
            tracing::debug!(
                target: "orca::process",
                process = %self.label,
                %status,
                "background process already exited"
            );
            return Ok(());
        }

        child
            .kill()
            .await
            .with_context(|| format!("failed to stop `{}`", self.label))?;
        tracing::debug!(target: "orca::process", process = %self.label, "background process stopped");
        Ok(())
    }
}

impl Drop for BackgroundProcess {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            tracing::warn!(
                target: "orca::process",
                process = %self.label,
                "background process dropped while running; killing it"
            );
            let _ = child.start_kill();
        }
    }
}

/// Runs real subprocesses with inherited output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

impl ProcessRunner for TokioProcessRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tracing::info!(target: "orca::process", command = %command, "running");
            let status = Command::new(command.program())
                .args(command.args())
                .current_dir(command.working_dir())
                .kill_on_drop(true)
                .status()
                .await
                .with_context(|| format!("failed to launch `{command}`"))?;

            if !status.success() {
                bail!("`{command}` exited with {status}");
            }
            Ok(())
        })
    }

    fn spawn(&self, command: &CommandSpec) -> Result<BackgroundProcess> {
        let child = Command::new(command.program())
            .args(command.args())
            .current_dir(command.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start `{command}`"))?;

        tracing::debug!(
            target: "orca::process",
            command = %command,
            pid = child.id(),
            "background process started"
        );
        Ok(BackgroundProcess::new(command.to_string(), child))
    }
}
