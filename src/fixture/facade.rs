use std::path::{Path, PathBuf};

const DOCROOT_DIR: &str = "docroot";
const MODULE_TREE: &str = "modules/contrib";

/// Path accessor for an on-disk fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    root: PathBuf,
}

impl Fixture {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether anything exists at the fixture root.
    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    /// The fixture root with `sub_path` appended; an empty sub-path yields the root itself.
    pub fn root_path(&self, sub_path: impl AsRef<Path>) -> PathBuf {
        join_non_empty(&self.root, sub_path.as_ref())
    }

    /// The host application's document root with `sub_path` appended.
    pub fn docroot_path(&self, sub_path: impl AsRef<Path>) -> PathBuf {
        join_non_empty(&self.root.join(DOCROOT_DIR), sub_path.as_ref())
    }

    /// The installed-module tree, or a single module's directory within it.
    pub fn module_install_path(&self, module: Option<&str>) -> PathBuf {
        let tree = self.docroot_path(MODULE_TREE);
        match module {
            Some(module) if !module.is_empty() => tree.join(module),
            _ => tree,
        }
    }
}

fn join_non_empty(base: &Path, sub_path: &Path) -> PathBuf {
    if sub_path.as_os_str().is_empty() {
        base.to_path_buf()
    } else {
        base.join(sub_path)
    }
}
