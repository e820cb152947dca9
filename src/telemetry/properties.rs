//! Builds the flat property bag attached to telemetry events from the
//! environment and from JSON artifacts left behind by earlier analysis tasks.

use crate::runtime::env::EnvReader;
use crate::telemetry::event::TelemetryEventName;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Property name to value; built fresh for every event.
pub type EventProperties = Map<String, Value>;

/// Static analysis output, relative to the project directory.
pub const METRICS_LOG_PATH: &str = "var/log/phploc.json";
/// Deprecated code scan output, relative to the project directory.
pub const DEPRECATIONS_LOG_PATH: &str = "var/log/phpstan.json";

/// Environment variables copied onto CI job events.
pub const ENVIRONMENT_VARIABLES: [&str; 11] = [
    "ORCA_JOB",
    "TRAVIS_ALLOW_FAILURE",
    "TRAVIS_COMMIT",
    "TRAVIS_COMMIT_MESSAGE",
    "TRAVIS_JOB_ID",
    "TRAVIS_JOB_NAME",
    "TRAVIS_JOB_NUMBER",
    "TRAVIS_JOB_WEB_URL",
    "TRAVIS_PHP_VERSION",
    "TRAVIS_REPO_SLUG",
    "TRAVIS_TEST_RESULT",
];

pub struct TelemetryEventPropertiesBuilder {
    env: Arc<dyn EnvReader>,
    project_dir: PathBuf,
}

impl TelemetryEventPropertiesBuilder {
    pub fn new(env: Arc<dyn EnvReader>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            env,
            project_dir: project_dir.into(),
        }
    }

    pub fn build(&self, name: TelemetryEventName) -> EventProperties {
        match name {
            TelemetryEventName::TravisCiJob => self.build_ci_job_properties(),
            TelemetryEventName::Test => test_properties(),
        }
    }

    fn build_ci_job_properties(&self) -> EventProperties {
        let mut properties = EventProperties::new();
        self.add_environment_variables(&mut properties);
        self.add_static_analysis_results(&mut properties);
        self.add_deprecation_scanning_results(&mut properties);
        properties
    }

    fn add_environment_variables(&self, properties: &mut EventProperties) {
        for key in ENVIRONMENT_VARIABLES {
            let value = self.env.get(key).map(Value::String).unwrap_or(Value::Null);
            properties.insert(key.to_owned(), value);
        }
    }

    fn add_static_analysis_results(&self, properties: &mut EventProperties) {
        let Some(data) = self.json_file_data(METRICS_LOG_PATH) else {
            return;
        };
        if !is_non_empty_structure(&data) {
            return;
        }
        properties.insert("metrics".to_owned(), data);
    }

    fn add_deprecation_scanning_results(&self, properties: &mut EventProperties) {
        let Some(totals) = self
            .json_file_data(DEPRECATIONS_LOG_PATH)
            .and_then(|mut data| data.get_mut("totals").map(Value::take))
        else {
            return;
        };
        if !is_non_empty_structure(&totals) {
            return;
        }
        properties.insert("deprecations".to_owned(), json!({ "totals": totals }));
    }

    /// Reads JSON from a project-relative path; any failure reads as "no data".
    fn json_file_data(&self, sub_path: &str) -> Option<Value> {
        let path = self.project_path(sub_path);
        if !path.exists() {
            return None;
        }

        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) => {
                tracing::debug!(
                    target: "orca::telemetry",
                    path = %path.display(),
                    error = %err,
                    "telemetry artifact unreadable; skipping"
                );
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::debug!(
                    target: "orca::telemetry",
                    path = %path.display(),
                    error = %err,
                    "telemetry artifact is not valid JSON; skipping"
                );
                None
            }
        }
    }

    /// The project directory with a sub-path appended.
    pub fn project_path(&self, sub_path: impl AsRef<Path>) -> PathBuf {
        self.project_dir.join(sub_path)
    }
}

fn test_properties() -> EventProperties {
    let mut properties = EventProperties::new();
    properties.insert("example".to_owned(), Value::Bool(true));
    properties
}

fn is_non_empty_structure(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}
