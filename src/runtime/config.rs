use crate::runtime::env::EnvReader;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PACKAGES_CONFIG: &str = "config/packages.yml";
pub const DEFAULT_WEB_ADDRESS: &str = "localhost:8000";
const DEFAULT_FIXTURE_DIR_NAME: &str = "orca-build";
const DEFAULT_SERVER_READY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SERVER_PROBE_INTERVAL_MS: u64 = 100;

pub const FIXTURE_DIR_ENV: &str = "ORCA_FIXTURE_DIR";
pub const PACKAGES_CONFIG_ENV: &str = "ORCA_PACKAGES_CONFIG";
pub const PACKAGES_CONFIG_ALTER_ENV: &str = "ORCA_PACKAGES_CONFIG_ALTER";

/// Runtime configuration shared by the package registry and the test orchestrator.
///
/// All instances must be constructed via [`OrcaConfig::builder`] or [`OrcaConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrcaConfig {
    project_dir: PathBuf,
    fixture_dir: PathBuf,
    packages_config: String,
    packages_config_alter: Option<String>,
    web_address: String,
    server_ready_timeout: Duration,
    server_probe_interval: Duration,
}

pub struct OrcaConfigParams {
    pub project_dir: PathBuf,
    pub fixture_dir: PathBuf,
    pub packages_config: String,
    pub packages_config_alter: Option<String>,
    pub web_address: String,
    pub server_ready_timeout: Duration,
    pub server_probe_interval: Duration,
}

impl OrcaConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> OrcaConfigBuilder {
        OrcaConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`OrcaConfig::builder`] when most values use defaults.
    pub fn new(params: OrcaConfigParams) -> Result<Self> {
        let OrcaConfigParams {
            project_dir,
            fixture_dir,
            packages_config,
            packages_config_alter,
            web_address,
            server_ready_timeout,
            server_probe_interval,
        } = params;

        let config = Self {
            project_dir,
            fixture_dir,
            packages_config: trimmed_string(packages_config),
            packages_config_alter: packages_config_alter
                .map(trimmed_string)
                .filter(|alter| !alter.is_empty()),
            web_address: trimmed_string(web_address),
            server_ready_timeout,
            server_probe_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// The project directory that declaration documents and artifacts are resolved against.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Root directory of the fixture under test.
    pub fn fixture_dir(&self) -> &Path {
        &self.fixture_dir
    }

    /// Base declaration document, relative to the project directory.
    pub fn packages_config(&self) -> &str {
        &self.packages_config
    }

    /// Optional override document, relative to the project directory.
    pub fn packages_config_alter(&self) -> Option<&str> {
        self.packages_config_alter.as_deref()
    }

    /// `host:port` the local web server listens on.
    pub fn web_address(&self) -> &str {
        &self.web_address
    }

    /// Upper bound on how long the orchestrator waits for the web server to accept connections.
    pub fn server_ready_timeout(&self) -> Duration {
        self.server_ready_timeout
    }

    /// Delay between readiness probe attempts.
    pub fn server_probe_interval(&self) -> Duration {
        self.server_probe_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        ensure_path_not_empty(&self.project_dir, "project_dir")?;
        ensure_path_not_empty(&self.fixture_dir, "fixture_dir")?;
        ensure_not_empty(&self.packages_config, "packages_config")?;
        validate_web_address(&self.web_address)?;

        if self.server_ready_timeout.is_zero() {
            bail!("server_ready_timeout must be greater than 0");
        }

        if self.server_probe_interval.is_zero() {
            bail!("server_probe_interval must be greater than 0");
        }

        if self.server_probe_interval > self.server_ready_timeout {
            bail!(
                "server_probe_interval ({:?}) must not exceed server_ready_timeout ({:?})",
                self.server_probe_interval,
                self.server_ready_timeout,
            );
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct OrcaConfigBuilder {
    project_dir: Option<PathBuf>,
    fixture_dir: Option<PathBuf>,
    packages_config: Option<String>,
    packages_config_alter: Option<String>,
    web_address: Option<String>,
    server_ready_timeout: Option<Duration>,
    server_probe_interval: Option<Duration>,
}

impl OrcaConfigBuilder {
    /// Seeds the fixture and declaration paths from `ORCA_*` environment variables.
    ///
    /// Values already set on the builder are overwritten only when the variable is present.
    pub fn from_env(mut self, env: &dyn EnvReader) -> Self {
        if let Some(dir) = non_blank(env.get(FIXTURE_DIR_ENV)) {
            self.fixture_dir = Some(PathBuf::from(dir));
        }
        if let Some(config) = non_blank(env.get(PACKAGES_CONFIG_ENV)) {
            self.packages_config = Some(config);
        }
        if let Some(alter) = non_blank(env.get(PACKAGES_CONFIG_ALTER_ENV)) {
            self.packages_config_alter = Some(alter);
        }
        self
    }

    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = Some(dir.into());
        self
    }

    pub fn packages_config(mut self, path: impl Into<String>) -> Self {
        self.packages_config = Some(path.into());
        self
    }

    pub fn packages_config_alter(mut self, path: impl Into<String>) -> Self {
        self.packages_config_alter = Some(path.into());
        self
    }

    pub fn web_address(mut self, address: impl Into<String>) -> Self {
        self.web_address = Some(address.into());
        self
    }

    pub fn server_ready_timeout(mut self, timeout: Duration) -> Self {
        self.server_ready_timeout = Some(timeout);
        self
    }

    pub fn server_probe_interval(mut self, interval: Duration) -> Self {
        self.server_probe_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<OrcaConfig> {
        let project_dir = self.project_dir.context("project_dir is required")?;
        let fixture_dir = match self.fixture_dir {
            Some(dir) => dir,
            None => default_fixture_dir(&project_dir)?,
        };

        let params = OrcaConfigParams {
            project_dir,
            fixture_dir,
            packages_config: self
                .packages_config
                .unwrap_or_else(|| DEFAULT_PACKAGES_CONFIG.to_owned()),
            packages_config_alter: self.packages_config_alter,
            web_address: self
                .web_address
                .unwrap_or_else(|| DEFAULT_WEB_ADDRESS.to_owned()),
            server_ready_timeout: self
                .server_ready_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_SERVER_READY_TIMEOUT_SECS)),
            server_probe_interval: self
                .server_probe_interval
                .unwrap_or_else(|| Duration::from_millis(DEFAULT_SERVER_PROBE_INTERVAL_MS)),
        };

        OrcaConfig::new(params)
    }
}

/// The fixture lives beside the project directory unless configured otherwise.
fn default_fixture_dir(project_dir: &Path) -> Result<PathBuf> {
    let parent = project_dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .with_context(|| {
            format!(
                "fixture_dir is required when project_dir ({}) has no parent",
                project_dir.display()
            )
        })?;
    Ok(parent.join(DEFAULT_FIXTURE_DIR_NAME))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn ensure_path_not_empty(value: &Path, field: &str) -> Result<()> {
    if value.as_os_str().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn validate_web_address(address: &str) -> Result<()> {
    let Some((host, port)) = address.rsplit_once(':') else {
        bail!("web_address must be in host:port form, got `{address}`");
    };
    if host.is_empty() {
        bail!("web_address must include a host, got `{address}`");
    }
    if port.parse::<u16>().is_err() {
        bail!("web_address must end with a numeric port, got `{address}`");
    }
    if address.contains("://") {
        bail!("web_address must not include a scheme, got `{address}`");
    }
    Ok(())
}
