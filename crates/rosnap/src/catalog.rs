//! Build-system package catalog
//!
//! A catalog answers "which packages live under this path?". The filesystem
//! implementation scans for `package.xml` files; the in-memory one serves
//! fixtures.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap};
use walkdir::WalkDir;

use crate::package::Package;
use crate::{Error, Result};

/// Marker files that indicate a directory should be ignored
const IGNORE_MARKERS: &[&str] = &["CATKIN_IGNORE", "COLCON_IGNORE", "AMENT_IGNORE"];

/// Directories that are never searched when directly under the scan root
const EXCLUDED_DIRS: &[&str] = &["build", "devel", "install", "log"];

/// Packages found under a path, indexed by name
pub type PackageMap = BTreeMap<String, Package>;

/// Lookup of build-system packages by filesystem path
pub trait PackageCatalog {
    /// Find all packages at or below `root`.
    ///
    /// A root that does not exist yields an empty map.
    fn find_packages(&self, root: &Utf8Path) -> Result<PackageMap>;
}

/// Catalog backed by a recursive scan for `package.xml` files
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemCatalog;

impl PackageCatalog for FilesystemCatalog {
    fn find_packages(&self, root: &Utf8Path) -> Result<PackageMap> {
        let mut packages = PackageMap::new();

        if !root.exists() {
            return Ok(packages);
        }

        let walker = WalkDir::new(root).follow_links(true);

        for entry in walker.into_iter().filter_entry(should_visit) {
            let entry = entry.map_err(|e| {
                Error::catalog(
                    format!("Failed to read directory entry: {}", e),
                    "Check directory permissions",
                )
            })?;

            let path = entry.path();
            if !(path.is_file() && path.file_name() == Some(std::ffi::OsStr::new("package.xml")))
            {
                continue;
            }

            let utf8_path = Utf8Path::from_path(path).ok_or_else(|| {
                Error::catalog(
                    format!("Path is not valid UTF-8: {:?}", path),
                    "Ensure all paths are valid UTF-8",
                )
            })?;

            match Package::from_path(utf8_path) {
                Ok(package) => {
                    tracing::debug!(name = %package.name, path = %package.path, "Discovered package");

                    if let Some(existing) = packages.insert(package.name.clone(), package) {
                        return Err(Error::catalog(
                            format!("Duplicate package name: {}", existing.name),
                            format!(
                                "Package '{}' exists at both {} and {}",
                                existing.name,
                                existing.path,
                                utf8_path.parent().unwrap_or(utf8_path)
                            ),
                        ));
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %utf8_path, error = %e, "Failed to parse package.xml");
                }
            }
        }

        Ok(packages)
    }
}

/// Check if a directory entry should be visited during package discovery
fn should_visit(entry: &walkdir::DirEntry) -> bool {
    let path = entry.path();

    if path.is_file() {
        return true;
    }

    // The scan root itself is always searched, whatever its name
    if entry.depth() == 0 {
        return true;
    }

    let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    if dir_name.starts_with('.') {
        return false;
    }

    if entry.depth() == 1 && EXCLUDED_DIRS.contains(&dir_name) {
        return false;
    }

    !IGNORE_MARKERS.iter().any(|marker| path.join(marker).exists())
}

/// Catalog backed by in-memory fixtures
///
/// Packages are registered under a directory; `find_packages(root)` returns
/// every package registered at or below `root`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    entries: HashMap<Utf8PathBuf, Package>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package at `dir`
    pub fn insert(&mut self, dir: impl Into<Utf8PathBuf>, package: Package) {
        self.entries.insert(dir.into(), package);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_package(mut self, dir: impl Into<Utf8PathBuf>, package: Package) -> Self {
        self.insert(dir, package);
        self
    }
}

impl PackageCatalog for InMemoryCatalog {
    fn find_packages(&self, root: &Utf8Path) -> Result<PackageMap> {
        Ok(self
            .entries
            .iter()
            .filter(|(dir, _)| dir.starts_with(root))
            .map(|(_, package)| (package.name.clone(), package.clone()))
            .collect())
    }
}
