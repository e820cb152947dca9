use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while loading or querying the package registry.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("no such file: {}", path.display())]
    MissingConfig { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("incorrect schema in {}: {detail}", path.display())]
    InvalidSchema { path: PathBuf, detail: String },

    #[error("invalid declaration for package {package}")]
    InvalidDeclaration {
        package: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no such package: {0}")]
    NotFound(String),
}

impl PackageError {
    /// True for every failure except an unknown package lookup.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, PackageError::NotFound(_))
    }
}
