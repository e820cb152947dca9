use anyhow::{bail, Error};
use std::fmt;
use std::str::FromStr;

/// Telemetry events the properties builder knows how to describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryEventName {
    /// A CI job finished; carries environment and analysis results.
    TravisCiJob,
    /// Wiring check with fixed content.
    Test,
}

impl TelemetryEventName {
    pub const ALL: [TelemetryEventName; 2] =
        [TelemetryEventName::TravisCiJob, TelemetryEventName::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            TelemetryEventName::TravisCiJob => "TRAVIS_CI_JOB",
            TelemetryEventName::Test => "TEST",
        }
    }
}

impl fmt::Display for TelemetryEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TelemetryEventName {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match Self::ALL.into_iter().find(|name| name.as_str() == value) {
            Some(name) => Ok(name),
            None => bail!("unknown telemetry event name `{value}`"),
        }
    }
}
