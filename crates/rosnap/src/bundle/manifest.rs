//! Snap metadata: `meta/package.yaml` and `meta/readme.md`

use serde::{Deserialize, Serialize};

use super::{BundleTree, snap_name};
use crate::package::Package;
use crate::{Error, Result};

/// One launcher exposed by the snap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryEntry {
    /// Path of the shim relative to the bundle root
    pub name: String,
}

/// Contents of `meta/package.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub vendor: String,
    pub binaries: Vec<BinaryEntry>,
}

impl Manifest {
    /// Build the manifest for `package`; only its first maintainer is used
    pub fn from_package(package: &Package, binaries: Vec<String>) -> Result<Self> {
        let maintainer = package.primary_maintainer().ok_or_else(|| {
            Error::package(
                format!("Package '{}' declares no maintainer", package.name),
                "Add a <maintainer email=\"...\">Name</maintainer> element to package.xml",
            )
        })?;

        Ok(Self {
            name: snap_name(&package.name),
            version: package.version.clone(),
            vendor: maintainer.to_string(),
            binaries: binaries
                .into_iter()
                .map(|name| BinaryEntry { name })
                .collect(),
        })
    }

    /// Serialize into `meta/package.yaml`
    pub fn write(&self, tree: &BundleTree) -> Result<()> {
        let meta_dir = tree.meta_dir();
        std::fs::create_dir_all(&meta_dir)?;
        std::fs::write(meta_dir.join("package.yaml"), serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Write `meta/readme.md`: the package name, a blank line and the description
pub fn write_readme(tree: &BundleTree, package: &Package) -> Result<()> {
    let meta_dir = tree.meta_dir();
    std::fs::create_dir_all(&meta_dir)?;
    let content = format!(
        "{}\n\n{}",
        package.name,
        package.description.as_deref().unwrap_or_default()
    );
    std::fs::write(meta_dir.join("readme.md"), content)?;
    Ok(())
}
