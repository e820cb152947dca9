use std::fs;
use std::sync::Arc;

use anyhow::Result;
use orca_harness::{TestRunState, Tester};

#[cfg(unix)]
use crate::support::helpers::process_alive;
use crate::support::helpers::{init_tracing, local_listener, Workspace};
use crate::support::recording::RecordingRunner;

#[tokio::test]
async fn full_run_executes_suites_in_order() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["beta", "alpha"])?;
    workspace.write_fixture_file(
        "docroot/modules/contrib/alpha/vendor/dep/behat.yml",
        "default: {}\n",
    )?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::default());
    let config = workspace.config(&address)?;
    let mut tester = Tester::new(&config, Arc::new(workspace.fixture()), runner.clone());
    tester.run().await?;
    assert_eq!(tester.state(), TestRunState::Done);

    let fixture = workspace.fixture();
    let spawned = runner.spawned();
    assert_eq!(spawned.len(), 1);
    assert_eq!(spawned[0].program().to_str(), Some("php"));
    assert_eq!(spawned[0].args(), ["-S".to_owned(), address.clone()]);
    assert_eq!(spawned[0].working_dir(), fixture.docroot_path(""));

    assert_eq!(runner.tools_run(), ["phpunit", "behat", "behat"]);
    let ran = runner.ran();
    let phpunit = &ran[0];
    assert_eq!(phpunit.program(), fixture.root_path("vendor/bin/phpunit"));
    assert_eq!(phpunit.working_dir(), fixture.root_path(""));
    assert_eq!(
        phpunit.args(),
        [
            format!(
                "--configuration={}",
                fixture.docroot_path("core/phpunit.xml.dist").display()
            ),
            format!(
                "--bootstrap={}",
                fixture.docroot_path("core/tests/bootstrap.php").display()
            ),
            fixture.module_install_path(None).display().to_string(),
        ]
    );

    let behat_configs: Vec<_> = ran[1..].iter().map(|command| command.args()[0].clone()).collect();
    assert_eq!(
        behat_configs,
        [
            format!(
                "--config={}",
                fixture.module_install_path(Some("alpha")).join("tests/behat.yml").display()
            ),
            format!(
                "--config={}",
                fixture.module_install_path(Some("beta")).join("tests/behat.yml").display()
            ),
        ]
    );

    let patched = fs::read_to_string(fixture.docroot_path("core/phpunit.xml.dist"))?;
    assert!(patched.contains(&format!(
        r#"<env name="SIMPLETEST_BASE_URL" value="http://{address}"/>"#
    )));
    assert!(patched.contains(r#"<env name="SYMFONY_DEPRECATIONS_HELPER" value="false"/>"#));
    Ok(())
}

#[tokio::test]
async fn sut_only_manifest_narrows_both_suites() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["example", "other"])?;
    workspace.write_fixture_file(
        "composer.json",
        r#"{"extra": {"orca": {"sut": "drupal/example", "sut-only": true}}}"#,
    )?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::default());
    let mut tester = Tester::new(
        &workspace.config(&address)?,
        Arc::new(workspace.fixture()),
        runner.clone(),
    );
    tester.run().await?;

    let fixture = workspace.fixture();
    let scope = fixture.module_install_path(Some("example"));
    let ran = runner.ran();
    assert_eq!(ran.len(), 2);
    assert_eq!(ran[0].args().last(), Some(&scope.display().to_string()));
    assert_eq!(
        ran[1].args(),
        [format!("--config={}", scope.join("tests/behat.yml").display())]
    );
    Ok(())
}

#[tokio::test]
async fn unit_failure_skips_behavior_tests_and_still_finishes() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["example"])?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::failing("phpunit"));
    let mut tester = Tester::new(
        &workspace.config(&address)?,
        Arc::new(workspace.fixture()),
        runner.clone(),
    );
    let err = tester.run().await.unwrap_err();

    assert!(format!("{err}").contains("exited with"));
    assert_eq!(tester.state(), TestRunState::Done);
    assert_eq!(runner.tools_run(), ["phpunit"]);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failed_run_still_stops_the_server() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["example"])?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::failing("phpunit").with_live_server());
    let mut tester = Tester::new(
        &workspace.config(&address)?,
        Arc::new(workspace.fixture()),
        runner.clone(),
    );
    assert!(tester.run().await.is_err());
    assert_eq!(tester.state(), TestRunState::Done);

    let pids = runner.server_pids();
    assert_eq!(pids.len(), 1);
    assert!(!process_alive(pids[0]), "server process {} outlived the run", pids[0]);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn successful_run_stops_the_server() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["example"])?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::default().with_live_server());
    let mut tester = Tester::new(
        &workspace.config(&address)?,
        Arc::new(workspace.fixture()),
        runner.clone(),
    );
    tester.run().await?;

    let pids = runner.server_pids();
    assert_eq!(pids.len(), 1);
    assert!(!process_alive(pids[0]));
    Ok(())
}

#[tokio::test]
async fn behavior_failure_stops_at_first_suite() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["alpha", "beta"])?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::failing("behat"));
    let mut tester = Tester::new(
        &workspace.config(&address)?,
        Arc::new(workspace.fixture()),
        runner.clone(),
    );
    assert!(tester.run().await.is_err());
    assert_eq!(runner.tools_run(), ["phpunit", "behat"]);
    Ok(())
}

#[tokio::test]
async fn missing_scope_directory_fails_after_unit_tests() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&[])?;
    let (_listener, address) = local_listener().await?;

    let runner = Arc::new(RecordingRunner::default());
    let mut tester = Tester::new(
        &workspace.config(&address)?,
        Arc::new(workspace.fixture()),
        runner.clone(),
    );
    let err = tester.run().await.unwrap_err();
    assert!(format!("{err}").contains("does not exist"));
    assert_eq!(runner.tools_run(), ["phpunit"]);
    assert_eq!(tester.state(), TestRunState::Done);
    Ok(())
}

#[tokio::test]
async fn second_run_leaves_patched_config_unchanged() -> Result<()> {
    init_tracing();
    let workspace = Workspace::new()?;
    workspace.scaffold_fixture(&["example"])?;
    let (_listener, address) = local_listener().await?;
    let config = workspace.config(&address)?;
    let phpunit_config = workspace.fixture().docroot_path("core/phpunit.xml.dist");

    let mut tester = Tester::new(
        &config,
        Arc::new(workspace.fixture()),
        Arc::new(RecordingRunner::default()),
    );
    tester.run().await?;
    let first = fs::read_to_string(&phpunit_config)?;
    tester.run().await?;
    assert_eq!(fs::read_to_string(&phpunit_config)?, first);
    Ok(())
}
