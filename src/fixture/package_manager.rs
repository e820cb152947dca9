//! Loads package declarations, applies the optional override document, and
//! indexes the surviving packages by name.

use crate::fixture::error::PackageError;
use crate::fixture::facade::Fixture;
use crate::fixture::package::Package;
use crate::runtime::config::{OrcaConfig, DEFAULT_PACKAGES_CONFIG};
use once_cell::sync::OnceCell;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The package every fixture structurally depends on.
pub const FOUNDATIONAL_PACKAGE: &str = "acquia/blt";

/// Registry of all packages in the active specification, keyed and ordered by name.
#[derive(Debug)]
pub struct PackageManager {
    alter_data: Mapping,
    fixture: Arc<Fixture>,
    packages: BTreeMap<String, Package>,
    project_dir: PathBuf,
    foundational: OnceCell<Package>,
}

impl PackageManager {
    /// Loads the registry.
    ///
    /// `packages_config` and `packages_config_alter` are relative to `project_dir`.
    /// Entries of the alter document replace entries of the base document by key; a
    /// `null` value removes the package from the active specification.
    pub fn new(
        fixture: Arc<Fixture>,
        project_dir: impl Into<PathBuf>,
        packages_config: &str,
        packages_config_alter: Option<&str>,
    ) -> Result<Self, PackageError> {
        let project_dir = project_dir.into();
        let mut data = parse_yaml_file(&project_dir.join(packages_config))?;

        let mut alter_data = Mapping::new();
        if let Some(alter) = packages_config_alter {
            alter_data = parse_yaml_file(&project_dir.join(alter))?;
            for (key, value) in &alter_data {
                data.insert(key.clone(), value.clone());
            }
        }

        let mut packages = BTreeMap::new();
        for (key, datum) in &data {
            let package_name = package_key(key, &project_dir.join(packages_config))?;
            if datum.is_null() {
                tracing::debug!(
                    target: "orca::packages",
                    package = package_name,
                    "package removed from the active specification"
                );
                continue;
            }
            let package = Package::new(package_name, datum, fixture.clone(), &project_dir)?;
            packages.insert(package_name.to_owned(), package);
        }

        tracing::info!(
            target: "orca::packages",
            packages = packages.len(),
            altered = !alter_data.is_empty(),
            "package registry loaded"
        );

        Ok(Self {
            alter_data,
            fixture,
            packages,
            project_dir,
            foundational: OnceCell::new(),
        })
    }

    /// Loads the registry using the paths carried by `config`.
    pub fn from_config(config: &OrcaConfig, fixture: Arc<Fixture>) -> Result<Self, PackageError> {
        Self::new(
            fixture,
            config.project_dir(),
            config.packages_config(),
            config.packages_config_alter(),
        )
    }

    /// Whether `package_name` is in the active specification.
    pub fn exists(&self, package_name: &str) -> bool {
        self.packages.contains_key(package_name)
    }

    pub fn get(&self, package_name: &str) -> Result<&Package, PackageError> {
        self.packages
            .get(package_name)
            .ok_or_else(|| PackageError::NotFound(package_name.to_owned()))
    }

    /// All active packages in package name order.
    pub fn all(&self) -> &BTreeMap<String, Package> {
        &self.packages
    }

    /// Returns the foundational package.
    ///
    /// It must be available even when the active specification removes it, so a miss
    /// falls back to the default declaration document, bypassing any alterations.
    pub fn foundational(&self) -> Result<&Package, PackageError> {
        self.foundational.get_or_try_init(|| {
            if let Some(package) = self.packages.get(FOUNDATIONAL_PACKAGE) {
                return Ok(package.clone());
            }

            let path = self.project_dir.join(DEFAULT_PACKAGES_CONFIG);
            tracing::debug!(
                target: "orca::packages",
                path = %path.display(),
                "foundational package absent from the active specification; using defaults"
            );
            let defaults = parse_yaml_file(&path)?;
            let datum = defaults
                .get(FOUNDATIONAL_PACKAGE)
                .filter(|datum| !datum.is_null())
                .ok_or_else(|| PackageError::InvalidSchema {
                    path: path.clone(),
                    detail: format!("missing declaration for {FOUNDATIONAL_PACKAGE}"),
                })?;
            Package::new(
                FOUNDATIONAL_PACKAGE,
                datum,
                self.fixture.clone(),
                &self.project_dir,
            )
        })
    }

    /// The override document exactly as loaded, or an empty mapping when none was configured.
    pub fn alter_data(&self) -> &Mapping {
        &self.alter_data
    }
}

fn parse_yaml_file(path: &Path) -> Result<Mapping, PackageError> {
    if !path.exists() {
        return Err(PackageError::MissingConfig {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| PackageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&text).map_err(|source| PackageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        other => Err(PackageError::InvalidSchema {
            path: path.to_path_buf(),
            detail: format!("expected a mapping of package names, got {}", kind_of(&other)),
        }),
    }
}

fn package_key<'a>(key: &'a Value, path: &Path) -> Result<&'a str, PackageError> {
    key.as_str().ok_or_else(|| PackageError::InvalidSchema {
        path: path.to_path_buf(),
        detail: format!("package names must be strings, got {key:?}"),
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
