use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

pub const BEHAT_CONFIG_FILE: &str = "behat.yml";
const VENDOR_DIR: &str = "vendor";

/// Finds every behavior-test configuration under `dir`, in path order.
///
/// Symlinks are followed. Anything below a `vendor` directory is skipped.
pub fn find_behat_configs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("test scope directory {} does not exist", dir.display());
    }

    let mut configs = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_vendor_dir(entry, dir));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(
                    target: "orca::behat",
                    error = %err,
                    "skipping unreadable entry during discovery"
                );
                continue;
            }
        };
        if entry.file_type().is_file() && entry.file_name() == BEHAT_CONFIG_FILE {
            configs.push(entry.into_path());
        }
    }

    tracing::debug!(
        target: "orca::behat",
        dir = %dir.display(),
        found = configs.len(),
        "discovered behavior-test configurations"
    );
    Ok(configs)
}

fn is_vendor_dir(entry: &DirEntry, root: &Path) -> bool {
    entry.file_type().is_dir()
        && entry
            .path()
            .strip_prefix(root)
            .map(|relative| relative.components().any(|part| part.as_os_str() == VENDOR_DIR))
            .unwrap_or(false)
}
