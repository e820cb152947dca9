use crate::fixture::facade::Fixture;
use crate::fixture::manifest::ComposerManifest;
use crate::fixture::package::project_name_of;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// The directory a test pass covers, and the manifest flags that chose it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestScope {
    directory: PathBuf,
    sut: Option<String>,
    sut_only: bool,
}

impl TestScope {
    /// Resolves the scope from the fixture's dependency manifest.
    ///
    /// The whole contrib module tree is the default. Only a manifest naming a
    /// system under test *and* setting `sut-only` narrows it to that package.
    pub fn resolve(fixture: &Fixture) -> Result<Self> {
        let manifest = ComposerManifest::load(fixture)?;
        Ok(Self::from_manifest(fixture, &manifest))
    }

    pub fn from_manifest(fixture: &Fixture, manifest: &ComposerManifest) -> Self {
        let sut = manifest.sut().map(str::to_owned);
        let sut_only = sut.is_some() && manifest.sut_only();

        let directory = match sut.as_deref() {
            Some(sut) if sut_only => fixture.module_install_path(Some(project_name_of(sut))),
            _ => fixture.module_install_path(None),
        };

        tracing::debug!(
            target: "orca::tester",
            directory = %directory.display(),
            sut = sut.as_deref().unwrap_or("-"),
            sut_only,
            "resolved test scope"
        );
        Self {
            directory,
            sut,
            sut_only,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn sut(&self) -> Option<&str> {
        self.sut.as_deref()
    }

    pub fn sut_only(&self) -> bool {
        self.sut_only
    }
}
