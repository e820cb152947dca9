use crate::fixture::facade::Fixture;
use crate::runtime::config::OrcaConfig;
use crate::tester::behat::find_behat_configs;
use crate::tester::phpunit::{ensure_phpunit_config, PhpUnitSettings};
use crate::tester::process::{CommandSpec, ProcessRunner};
use crate::tester::scope::TestScope;
use crate::tester::server::WebServer;
use anyhow::Result;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const PHPUNIT_CONFIG: &str = "core/phpunit.xml.dist";
const PHPUNIT_BOOTSTRAP: &str = "core/tests/bootstrap.php";
const VENDOR_BIN: &str = "vendor/bin";

/// Where a [`Tester`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestRunState {
    Idle,
    ServerStarting,
    ServerRunning,
    UnitTestsRunning,
    BehaviorTestsRunning,
    ServerStopping,
    Done,
}

impl TestRunState {
    pub fn as_str(self) -> &'static str {
        match self {
            TestRunState::Idle => "idle",
            TestRunState::ServerStarting => "server_starting",
            TestRunState::ServerRunning => "server_running",
            TestRunState::UnitTestsRunning => "unit_tests_running",
            TestRunState::BehaviorTestsRunning => "behavior_tests_running",
            TestRunState::ServerStopping => "server_stopping",
            TestRunState::Done => "done",
        }
    }
}

impl fmt::Display for TestRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs the unit and behavior suites of a fixture against a local web server.
pub struct Tester {
    fixture: Arc<Fixture>,
    runner: Arc<dyn ProcessRunner>,
    web_address: String,
    ready_timeout: Duration,
    probe_interval: Duration,
    state: TestRunState,
}

impl Tester {
    pub fn new(config: &OrcaConfig, fixture: Arc<Fixture>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            fixture,
            runner,
            web_address: config.web_address().to_owned(),
            ready_timeout: config.server_ready_timeout(),
            probe_interval: config.server_probe_interval(),
            state: TestRunState::Idle,
        }
    }

    pub fn state(&self) -> TestRunState {
        self.state
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// Runs one full test pass.
    ///
    /// The web server is stopped on every exit path once it has started. The first
    /// failure is returned; test-runner failures propagate as-is. The tester ends in
    /// [`TestRunState::Done`] either way.
    pub async fn run(&mut self) -> Result<()> {
        let outcome = self.run_session().await;
        self.transition(TestRunState::Done);
        if let Err(err) = &outcome {
            tracing::warn!(target: "orca::tester", error = %err, "test run failed");
        }
        outcome
    }

    async fn run_session(&mut self) -> Result<()> {
        self.transition(TestRunState::ServerStarting);
        let server = WebServer::start(
            self.runner.as_ref(),
            &self.fixture.docroot_path(""),
            &self.web_address,
            self.ready_timeout,
            self.probe_interval,
        )
        .await?;
        self.transition(TestRunState::ServerRunning);

        let outcome = self.run_suites(server.address()).await;

        self.transition(TestRunState::ServerStopping);
        let stopped = server.stop().await;
        match (outcome, stopped) {
            (Err(err), Err(stop_err)) => {
                tracing::warn!(
                    target: "orca::tester",
                    error = %stop_err,
                    "failed to stop web server after a failed run"
                );
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Ok(()), stopped) => stopped,
        }
    }

    async fn run_suites(&mut self, address: &str) -> Result<()> {
        let phpunit_config = self.fixture.docroot_path(PHPUNIT_CONFIG);
        ensure_phpunit_config(&phpunit_config, &PhpUnitSettings::for_address(address)).await?;

        let scope = TestScope::resolve(&self.fixture)?;

        self.transition(TestRunState::UnitTestsRunning);
        let phpunit = CommandSpec::new(self.tool("phpunit"), self.fixture.root_path(""))
            .arg(format!("--configuration={}", phpunit_config.display()))
            .arg(format!(
                "--bootstrap={}",
                self.fixture.docroot_path(PHPUNIT_BOOTSTRAP).display()
            ))
            .arg(scope.directory().display().to_string());
        self.runner.run(&phpunit).await?;

        self.transition(TestRunState::BehaviorTestsRunning);
        for config in find_behat_configs(scope.directory())? {
            let behat = CommandSpec::new(self.tool("behat"), self.fixture.root_path(""))
                .arg(format!("--config={}", config.display()));
            self.runner.run(&behat).await?;
        }
        Ok(())
    }

    fn tool(&self, name: &str) -> PathBuf {
        self.fixture.root_path(VENDOR_BIN).join(name)
    }

    fn transition(&mut self, next: TestRunState) {
        tracing::info!(
            target: "orca::tester",
            from = %self.state,
            to = %next,
            "test run state changed"
        );
        self.state = next;
    }
}
