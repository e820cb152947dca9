use std::sync::Arc;

use anyhow::Result;
use orca_harness::{MapEnv, TelemetryEventName, TelemetryEventPropertiesBuilder};
use serde_json::{json, Value};

use crate::support::helpers::Workspace;

#[test]
fn ci_job_event_collects_environment_and_artifacts() -> Result<()> {
    let workspace = Workspace::new()?;
    workspace.write_project_file("var/log/phploc.json", r#"{"loc": 1200, "classes": 14}"#)?;
    workspace.write_project_file(
        "var/log/phpstan.json",
        r#"{"totals": {"errors": 0, "file_errors": 3}, "files": {}}"#,
    )?;
    let env = MapEnv::new()
        .with("ORCA_JOB", "DEPRECATED_CODE_SCAN")
        .with("TRAVIS_COMMIT", "abc123");

    let properties = TelemetryEventPropertiesBuilder::new(Arc::new(env), workspace.project_dir())
        .build("TRAVIS_CI_JOB".parse::<TelemetryEventName>()?);

    assert_eq!(properties["ORCA_JOB"], json!("DEPRECATED_CODE_SCAN"));
    assert_eq!(properties["TRAVIS_COMMIT"], json!("abc123"));
    assert_eq!(properties["TRAVIS_JOB_ID"], Value::Null);
    assert_eq!(properties["metrics"], json!({"loc": 1200, "classes": 14}));
    assert_eq!(
        properties["deprecations"],
        json!({"totals": {"errors": 0, "file_errors": 3}})
    );
    Ok(())
}

#[test]
fn broken_artifacts_are_left_out() -> Result<()> {
    let workspace = Workspace::new()?;
    workspace.write_project_file("var/log/phploc.json", "{truncated")?;
    workspace.write_project_file("var/log/phpstan.json", r#"{"files": {}}"#)?;

    let properties =
        TelemetryEventPropertiesBuilder::new(Arc::new(MapEnv::new()), workspace.project_dir())
            .build(TelemetryEventName::TravisCiJob);

    assert!(!properties.contains_key("metrics"));
    assert!(!properties.contains_key("deprecations"));
    assert_eq!(properties.len(), 11);
    Ok(())
}
