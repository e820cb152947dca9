use crate::fixture::facade::Fixture;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;

const MANIFEST_FILE: &str = "composer.json";

/// The fixture's dependency manifest, reduced to the keys the harness reads.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ComposerManifest {
    data: Value,
}

impl ComposerManifest {
    /// Reads `composer.json` from the fixture root. A missing file yields an empty manifest.
    pub fn load(fixture: &Fixture) -> Result<Self> {
        let path = fixture.root_path(MANIFEST_FILE);
        if !path.exists() {
            tracing::debug!(
                target: "orca::fixture",
                path = %path.display(),
                "no dependency manifest; using defaults"
            );
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// The declared system-under-test package name, if any.
    pub fn sut(&self) -> Option<&str> {
        self.orca_extra("sut")
            .and_then(Value::as_str)
            .filter(|sut| !sut.is_empty())
    }

    /// Whether the fixture was built for the system under test only.
    pub fn sut_only(&self) -> bool {
        self.orca_extra("sut-only").map(is_truthy).unwrap_or(false)
    }

    fn orca_extra(&self, key: &str) -> Option<&Value> {
        self.data.get("extra")?.get("orca")?.get(key)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => !text.is_empty() && text != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
