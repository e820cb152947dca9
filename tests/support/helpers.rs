use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use once_cell::sync::Lazy;
use orca_harness::{Fixture, OrcaConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub const PHPUNIT_DIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<phpunit bootstrap="tests/bootstrap.php" colors="true">
  <php>
    <ini name="error_reporting" value="32767"/>
    <env name="SIMPLETEST_BASE_URL" value=""/>
    <env name="SIMPLETEST_DB" value=""/>
  </php>
</phpunit>
"#;

/// A project directory next to a fixture directory, both inside one temp dir.
pub struct Workspace {
    _dir: TempDir,
    project_dir: PathBuf,
    fixture_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let project_dir = dir.path().join("orca");
        let fixture_dir = dir.path().join("orca-build");
        fs::create_dir_all(&project_dir)?;
        fs::create_dir_all(&fixture_dir)?;
        Ok(Self {
            _dir: dir,
            project_dir,
            fixture_dir,
        })
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn fixture_dir(&self) -> &Path {
        &self.fixture_dir
    }

    pub fn fixture(&self) -> Fixture {
        Fixture::new(&self.fixture_dir)
    }

    pub fn write_project_file(&self, sub_path: &str, contents: &str) -> Result<PathBuf> {
        write_file(&self.project_dir.join(sub_path), contents)
    }

    pub fn write_fixture_file(&self, sub_path: &str, contents: &str) -> Result<PathBuf> {
        write_file(&self.fixture_dir.join(sub_path), contents)
    }

    /// Lays out a host application with the given contrib modules and one `behat.yml` each.
    pub fn scaffold_fixture(&self, modules: &[&str]) -> Result<()> {
        self.write_fixture_file("docroot/core/phpunit.xml.dist", PHPUNIT_DIST)?;
        self.write_fixture_file("docroot/core/tests/bootstrap.php", "<?php\n")?;
        for module in modules {
            self.write_fixture_file(
                &format!("docroot/modules/contrib/{module}/tests/behat.yml"),
                "default: {}\n",
            )?;
        }
        Ok(())
    }

    pub fn config(&self, web_address: &str) -> Result<OrcaConfig> {
        OrcaConfig::builder()
            .project_dir(&self.project_dir)
            .fixture_dir(&self.fixture_dir)
            .web_address(web_address)
            .server_ready_timeout(Duration::from_secs(2))
            .server_probe_interval(Duration::from_millis(10))
            .build()
    }
}

pub fn write_file(path: &Path, contents: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(path.to_path_buf())
}

/// Whether `pid` still names a live process.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Binds an ephemeral local port so readiness probes succeed against it.
pub async fn local_listener() -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    Ok((listener, address))
}
