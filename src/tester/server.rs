use crate::tester::process::{BackgroundProcess, CommandSpec, ProcessRunner};
use anyhow::{bail, Result};
use std::path::Path;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{self, sleep, Instant};

const SERVER_PROGRAM: &str = "php";

/// Waits until something accepts TCP connections on `address`.
pub async fn wait_until_accepting(
    address: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    poll_until_accepting(address, timeout, interval, || Ok(())).await
}

async fn poll_until_accepting<F>(
    address: &str,
    timeout: Duration,
    interval: Duration,
    mut still_running: F,
) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        still_running()?;
        attempts += 1;
        let remaining = timeout.saturating_sub(start.elapsed()).max(interval);
        let last_error = match time::timeout(remaining, TcpStream::connect(address)).await {
            Ok(Ok(_stream)) => {
                tracing::debug!(
                    target: "orca::server",
                    address,
                    attempts,
                    "address is accepting connections"
                );
                return Ok(());
            }
            Ok(Err(err)) => err.to_string(),
            Err(_) => "connect timed out".to_owned(),
        };

        if start.elapsed() + interval > timeout {
            bail!(
                "{address} did not accept connections within {timeout:?} after {attempts} \
                 attempts (last error: {last_error})"
            );
        }
        sleep(interval).await;
    }
}

/// Waits for `address` to accept connections while the server process stays up.
async fn wait_for_server(
    process: &mut BackgroundProcess,
    address: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    poll_until_accepting(address, timeout, interval, || ensure_running(process)).await?;
    // A stale listener accepts at once; a server that failed to bind exits shortly after.
    sleep(interval).await;
    ensure_running(process)
}

fn ensure_running(process: &mut BackgroundProcess) -> Result<()> {
    if process.has_exited()? {
        bail!("web server exited before becoming ready");
    }
    Ok(())
}

/// The local web server serving the fixture's document root.
///
/// Stop it explicitly with [`WebServer::stop`]; dropping it kills the process.
#[derive(Debug)]
pub struct WebServer {
    address: String,
    process: BackgroundProcess,
}

impl WebServer {
    /// Starts the server and returns once it accepts connections.
    pub async fn start(
        runner: &dyn ProcessRunner,
        docroot: &Path,
        address: &str,
        ready_timeout: Duration,
        probe_interval: Duration,
    ) -> Result<Self> {
        let command = CommandSpec::new(SERVER_PROGRAM, docroot)
            .arg("-S")
            .arg(address);
        let mut process = runner.spawn(&command)?;

        if let Err(err) = wait_for_server(&mut process, address, ready_timeout, probe_interval).await
        {
            if let Err(stop_err) = process.stop().await {
                tracing::warn!(
                    target: "orca::server",
                    error = %stop_err,
                    "failed to stop web server after readiness failure"
                );
            }
            return Err(err.context("web server never became ready"));
        }

        tracing::info!(
            target: "orca::server",
            address,
            docroot = %docroot.display(),
            "web server ready"
        );
        Ok(Self {
            address: address.to_owned(),
            process,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub async fn stop(mut self) -> Result<()> {
        self.process.stop().await?;
        tracing::info!(target: "orca::server", address = %self.address, "web server stopped");
        Ok(())
    }
}
