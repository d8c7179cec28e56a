//! Snap bundle layout, payload copying and metadata generation
//!
//! A bundle lives at `<output_dir>/<snap name>/` and contains:
//! - `meta/`: `readme.md` and the `package.yaml` manifest
//! - `bin/`: generated launcher shims
//! - `install/`: the package's own install space
//! - everything else: system payload re-rooted under the bundle

mod copy;
mod manifest;
mod resolver;
mod shim;

use camino::{Utf8Path, Utf8PathBuf};

use crate::Result;

pub use copy::{copy_install_tree, copy_installed_files};
pub use manifest::{BinaryEntry, Manifest, write_readme};
pub use resolver::{CopiedSet, DependencyBundler, EcosystemPolicy};
pub use shim::{BINARY_SUBDIRS, EnvironmentScript, collect_binaries, write_launch_shims};

/// Convert a ROS package name into a snap name (`my_pkg` -> `my-pkg`)
pub fn snap_name(package_name: &str) -> String {
    package_name.replace('_', "-").to_lowercase()
}

/// Directory structure of one bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTree {
    root: Utf8PathBuf,
}

impl BundleTree {
    /// Bundle for `package_name` inside `output_dir`
    pub fn new(output_dir: &Utf8Path, package_name: &str) -> Self {
        Self {
            root: output_dir.join(snap_name(package_name)),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn meta_dir(&self) -> Utf8PathBuf {
        self.root.join("meta")
    }

    pub fn bin_dir(&self) -> Utf8PathBuf {
        self.root.join("bin")
    }

    pub fn install_dir(&self) -> Utf8PathBuf {
        self.root.join("install")
    }

    /// Where an absolute system path lands inside the bundle
    pub fn rebase(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }

    /// Create the bundle skeleton, removing any previous bundle at this path
    pub fn create(&self) -> Result<()> {
        if self.root.exists() {
            tracing::info!(path = %self.root, "Removing previous bundle");
            std::fs::remove_dir_all(&self.root)?;
        }

        std::fs::create_dir_all(self.meta_dir())?;
        std::fs::create_dir_all(self.bin_dir())?;
        Ok(())
    }
}
