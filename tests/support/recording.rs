use std::sync::Mutex;

use anyhow::{bail, Result};
use futures::future::BoxFuture;
use orca_harness::{BackgroundProcess, CommandSpec, ProcessRunner, TokioProcessRunner};

/// Records every command instead of executing it.
#[derive(Default)]
pub struct RecordingRunner {
    ran: Mutex<Vec<CommandSpec>>,
    spawned: Mutex<Vec<CommandSpec>>,
    failing_tool: Option<String>,
    live_server: bool,
    server_pids: Mutex<Vec<u32>>,
}

impl RecordingRunner {
    /// Any `run` of a program whose file name is `tool` exits non-zero.
    pub fn failing(tool: &str) -> Self {
        Self {
            failing_tool: Some(tool.to_owned()),
            ..Self::default()
        }
    }

    /// Backs every spawned server with a real `sleep` process instead of a detached handle.
    pub fn with_live_server(mut self) -> Self {
        self.live_server = true;
        self
    }

    pub fn server_pids(&self) -> Vec<u32> {
        self.server_pids.lock().unwrap().clone()
    }

    pub fn ran(&self) -> Vec<CommandSpec> {
        self.ran.lock().unwrap().clone()
    }

    pub fn spawned(&self) -> Vec<CommandSpec> {
        self.spawned.lock().unwrap().clone()
    }

    /// Program file names of the commands run so far, in order.
    pub fn tools_run(&self) -> Vec<String> {
        self.ran()
            .iter()
            .filter_map(|command| command.program().file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

impl ProcessRunner for RecordingRunner {
    fn run<'a>(&'a self, command: &'a CommandSpec) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.ran.lock().unwrap().push(command.clone());
            let tool = command.program().file_name().and_then(|name| name.to_str());
            if tool.is_some() && tool == self.failing_tool.as_deref() {
                bail!("`{command}` exited with exit status: 1");
            }
            Ok(())
        })
    }

    fn spawn(&self, command: &CommandSpec) -> Result<BackgroundProcess> {
        self.spawned.lock().unwrap().push(command.clone());
        if !self.live_server {
            return Ok(BackgroundProcess::detached(command.to_string()));
        }

        let process =
            TokioProcessRunner.spawn(&CommandSpec::new("sleep", command.working_dir()).arg("30"))?;
        if let Some(pid) = process.id() {
            self.server_pids.lock().unwrap().push(pid);
        }
        Ok(process)
    }
}
