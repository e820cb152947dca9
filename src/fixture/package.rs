//! A single package declaration resolved against the fixture and project directories.

use crate::fixture::error::PackageError;
use crate::fixture::facade::Fixture;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_TYPE: &str = "drupal-module";
const DEFAULT_VERSION: &str = "*";
const DEFAULT_VERSION_DEV: &str = "*@dev";

/// Known fields of a declaration. Unknown fields stay available through [`Package::data`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageDeclaration {
    #[serde(rename = "type")]
    kind: Option<String>,
    install_path: Option<String>,
    url: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    version: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    version_dev: Option<String>,
    enable: Option<bool>,
}

/// A package under test or in the fixture's dependency graph. Immutable once built.
#[derive(Debug, Clone)]
pub struct Package {
    package_name: String,
    project_name: String,
    kind: String,
    install_path: String,
    url: String,
    version: String,
    version_dev: String,
    enable: bool,
    data: Mapping,
    fixture: Arc<Fixture>,
    project_dir: PathBuf,
}

impl Package {
    /// Builds a record from one declaration document entry.
    pub fn new(
        package_name: impl Into<String>,
        declaration: &Value,
        fixture: Arc<Fixture>,
        project_dir: impl Into<PathBuf>,
    ) -> Result<Self, PackageError> {
        let package_name = package_name.into();
        let parsed: PackageDeclaration =
            serde_yaml::from_value(declaration.clone()).map_err(|source| {
                PackageError::InvalidDeclaration {
                    package: package_name.clone(),
                    source,
                }
            })?;
        let data = match declaration {
            Value::Mapping(mapping) => mapping.clone(),
            _ => Mapping::new(),
        };

        let project_name = project_name_of(&package_name).to_owned();
        let kind = parsed.kind.unwrap_or_else(|| DEFAULT_TYPE.to_owned());
        let install_path = parsed
            .install_path
            .unwrap_or_else(|| default_install_path(&kind, &package_name, &project_name));
        let url = parsed
            .url
            .unwrap_or_else(|| format!("../{project_name}"));
        let enable = parsed.enable.unwrap_or(kind == DEFAULT_TYPE);

        Ok(Self {
            package_name,
            project_name,
            kind,
            install_path,
            url,
            version: parsed.version.unwrap_or_else(|| DEFAULT_VERSION.to_owned()),
            version_dev: parsed
                .version_dev
                .unwrap_or_else(|| DEFAULT_VERSION_DEV.to_owned()),
            enable,
            data,
            fixture,
            project_dir: project_dir.into(),
        })
    }

    /// Full package name, e.g. `drupal/example`.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// The name after the vendor prefix, e.g. `example`.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Package type, e.g. `drupal-module` or `library`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Install path relative to the fixture root.
    pub fn install_path_relative(&self) -> &str {
        &self.install_path
    }

    pub fn install_path_absolute(&self) -> PathBuf {
        self.fixture.root_path(&self.install_path)
    }

    /// Local repository location relative to the project directory.
    pub fn repository_url_relative(&self) -> &str {
        &self.url
    }

    pub fn repository_url_absolute(&self) -> PathBuf {
        self.project_dir.join(&self.url)
    }

    pub fn version_recommended(&self) -> &str {
        &self.version
    }

    pub fn version_dev(&self) -> &str {
        &self.version_dev
    }

    pub fn should_get_enabled(&self) -> bool {
        self.enable
    }

    /// Raw declaration data as written in the declaration document.
    pub fn data(&self) -> &Mapping {
        &self.data
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

/// Returns the part of a package name after the vendor slash.
pub fn project_name_of(package_name: &str) -> &str {
    package_name
        .split_once('/')
        .map(|(_, project)| project)
        .unwrap_or(package_name)
}

fn default_install_path(kind: &str, package_name: &str, project_name: &str) -> String {
    match kind {
        "drupal-core" => "docroot/core".to_owned(),
        "drupal-module" => format!("docroot/modules/contrib/{project_name}"),
        "drupal-theme" => format!("docroot/themes/contrib/{project_name}"),
        "drupal-profile" => format!("docroot/profiles/contrib/{project_name}"),
        "drupal-library" | "bower-asset" | "npm-asset" => {
            format!("docroot/libraries/{project_name}")
        }
        _ => format!("vendor/{package_name}"),
    }
}

/// Version constraints are frequently written as bare numbers in YAML.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(Value::Bool(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a scalar version constraint, got {other:?}"
        ))),
    }
}
