//! System package lookups
//!
//! Two capabilities are needed to bundle runtime dependencies:
//! - [`KeyResolver`]: map a ROS dependency key to binary package names (rosdep)
//! - [`SystemCache`]: query installed files and dependencies of a binary
//!   package (dpkg)
//!
//! Each has a real implementation shelling out to the host tools and an
//! in-memory implementation for fixtures.

mod dpkg;
mod memory;
mod rosdep;

use camino::Utf8PathBuf;

use crate::Result;

pub use dpkg::{DpkgCache, parse_depends};
pub use memory::{InMemoryResolver, InMemorySystemCache};
pub use rosdep::{RosdepResolver, parse_resolve_output};

/// Target platform for key resolution, e.g. `ubuntu:trusty`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// OS name
    pub os: String,
    /// OS version or codename
    pub version: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.os, self.version)
    }
}

/// A binary package as known to the system package manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPackage {
    /// Binary package name
    pub name: String,
    /// Absolute paths of every installed file and directory
    pub installed_files: Vec<Utf8PathBuf>,
    /// Names of the packages this one depends on
    pub depends: Vec<String>,
}

/// Resolution of ROS dependency keys to binary package names
pub trait KeyResolver {
    /// Resolve `key` for `platform`. An unknown key yields an empty list.
    fn resolve(&self, key: &str, platform: &Platform) -> Result<Vec<String>>;
}

/// Read access to the system package database
pub trait SystemCache {
    /// Whether the cache knows a package with this name
    fn contains(&self, name: &str) -> Result<bool>;

    /// Look up a package, `None` if unknown
    fn package(&self, name: &str) -> Result<Option<SystemPackage>>;
}
