//! Snap bundle construction
//!
//! A [`SnapBuilder`] is prepared either from a catkin workspace or from the
//! installed ROS distribution, then [`build`](SnapBuilder::build) writes the
//! metadata and copies runtime dependencies. [`pack_snap`] runs the packaging
//! tool once the builder, and with it the system cache, is gone.

use camino::{Utf8Path, Utf8PathBuf};

use crate::bundle::{
    BundleTree, CopiedSet, DependencyBundler, EcosystemPolicy, EnvironmentScript, Manifest,
    collect_binaries, copy_install_tree, write_launch_shims, write_readme,
};
use crate::catalog::{PackageCatalog, PackageMap};
use crate::config::{Config, RosEnvironment};
use crate::package::Package;
use crate::process::run_command;
use crate::system::{KeyResolver, SystemCache};
use crate::{Error, Result};

/// Setup files copied from the ROS prefix into the bundle
const ENV_SCRIPTS: &[&str] = &["setup.bash", "setup.sh", "_setup_util.py"];

/// Which build steps to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Write meta/ and launcher shims
    pub generate_metadata: bool,
    /// Copy all recursive run dependencies
    pub copy_dependencies: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            generate_metadata: true,
            copy_dependencies: true,
        }
    }
}

/// The package databases a build queries
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub catalog: &'a dyn PackageCatalog,
    pub resolver: &'a dyn KeyResolver,
    pub cache: &'a dyn SystemCache,
}

/// Outcome of a build
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Root directory of the bundle
    pub bundle_root: Utf8PathBuf,
    /// Manifest binary entries that were written
    pub binaries: Vec<String>,
    /// Everything the dependency walk processed
    pub copied: CopiedSet,
}

/// Builds the snap bundle of one package
pub struct SnapBuilder<'a> {
    config: &'a Config,
    ros: &'a RosEnvironment,
    backends: Backends<'a>,
    package: Package,
    tree: BundleTree,
    pkg_root: Utf8PathBuf,
    script: EnvironmentScript,
    copied: CopiedSet,
}

impl<'a> SnapBuilder<'a> {
    /// Prepare a bundle from the catkin workspace at `workspace_root`
    ///
    /// Builds and installs the workspace, then copies the install space of
    /// `package_name` and the workspace setup files into a fresh bundle.
    pub fn prepare_from_source(
        workspace_root: &Utf8Path,
        package_name: &str,
        config: &'a Config,
        ros: &'a RosEnvironment,
        backends: Backends<'a>,
    ) -> Result<Self> {
        let src_dir = workspace_root.join("src");
        let packages = backends.catalog.find_packages(&src_dir)?;
        if packages.is_empty() {
            return Err(Error::catalog(
                format!("No packages found in catkin workspace at {}", src_dir),
                "Run rosnap at the root of a catkin workspace",
            ));
        }

        let package = find_root_package(&packages, package_name)?;

        if config.source.build_command.is_empty() {
            tracing::debug!("No workspace build command configured, using existing install space");
        } else {
            run_command(&config.source.build_command, workspace_root, "Workspace build")?;
        }

        let pkg_root = workspace_root.join(&config.source.install_dir);
        let script = EnvironmentScript::workspace(ros.prefix());
        let builder = Self::new(config, ros, backends, workspace_root, package, pkg_root, script);

        builder.tree.create()?;

        // Setup scripts at the top of the install space
        let install_dir = builder.tree.install_dir();
        std::fs::create_dir_all(&install_dir)?;
        for entry in builder.pkg_root.read_dir_utf8()? {
            let entry = entry?;
            if entry.path().is_file() {
                std::fs::copy(entry.path(), install_dir.join(entry.file_name()))?;
            }
        }

        builder.copy_files_from_pkg_root()?;
        Ok(builder)
    }

    /// Prepare a bundle from the installed ROS distribution
    ///
    /// The package must be installed as a binary package; its install space
    /// files and the binary package's own files are copied into a fresh bundle.
    pub fn prepare_from_debs(
        workspace_root: &Utf8Path,
        package_name: &str,
        config: &'a Config,
        ros: &'a RosEnvironment,
        backends: Backends<'a>,
    ) -> Result<Self> {
        let share_dir = host_path(config, ros.share_dir());
        let packages = backends.catalog.find_packages(&share_dir)?;
        if packages.is_empty() {
            return Err(Error::catalog(
                format!("No catkin packages found in {}", share_dir),
                "Check that ROS_ROOT points into an installed ROS distribution",
            ));
        }

        let package = find_root_package(&packages, package_name)?;
        let pkg_root = host_path(config, ros.prefix());
        let script = EnvironmentScript::installed(ros.prefix());
        let mut builder = Self::new(config, ros, backends, workspace_root, package, pkg_root, script);

        let system_package = {
            let bundler = builder.bundler();
            let name = bundler.resolve_key(&builder.package.name)?.ok_or_else(|| {
                Error::resolve(
                    format!("Could not resolve package '{}' to a system package", package_name),
                    "Check that the package is released for this distribution and run 'rosdep update'",
                )
            })?;
            backends.cache.package(&name)?.ok_or_else(|| {
                Error::resolve(
                    format!("System package '{}' is not installed", name),
                    format!("Install it with 'apt-get install {}'", name),
                )
            })?
        };

        builder.tree.create()?;
        builder.copy_files_from_pkg_root()?;

        let bundler = make_bundler(config, ros, backends, &builder.tree);
        builder.copied.insert(builder.package.name.clone());
        bundler.copy_payload(&system_package, &mut builder.copied)?;

        Ok(builder)
    }

    fn new(
        config: &'a Config,
        ros: &'a RosEnvironment,
        backends: Backends<'a>,
        workspace_root: &Utf8Path,
        package: Package,
        pkg_root: Utf8PathBuf,
        script: EnvironmentScript,
    ) -> Self {
        let output_dir = workspace_root.join(&config.bundle.output_dir);
        tracing::info!(package = %package.name, root = %pkg_root, "Package root");

        Self {
            config,
            ros,
            backends,
            tree: BundleTree::new(&output_dir, &package.name),
            package,
            pkg_root,
            script,
            copied: CopiedSet::new(),
        }
    }

    /// The package being bundled
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// The bundle being written
    pub fn tree(&self) -> &BundleTree {
        &self.tree
    }

    fn bundler(&self) -> DependencyBundler<'_> {
        make_bundler(self.config, self.ros, self.backends, &self.tree)
    }

    /// Run the enabled metadata and dependency steps
    pub fn build(mut self, options: &BuildOptions) -> Result<BuildReport> {
        tracing::info!(package = %self.package.name, "Building snap");

        let mut binaries = Vec::new();
        if options.generate_metadata {
            tracing::info!("Writing snap metadata to {}", self.tree.meta_dir());
            binaries = self.write_metadata()?;
            self.copy_env_scripts()?;
        }

        if options.copy_dependencies {
            tracing::info!("Copying all recursive run dependencies into snap");
            let bundler = make_bundler(self.config, self.ros, self.backends, &self.tree);
            bundler.copy_recursive_dependencies(&self.package, &mut self.copied)?;
            for key in &self.config.resolve.core_dependencies {
                bundler.resolve_and_copy(key, &mut self.copied)?;
            }
            tracing::info!(
                names = self.copied.len(),
                packages = self.copied.payloads().len(),
                "Dependencies bundled"
            );
        }

        Ok(BuildReport {
            bundle_root: self.tree.root().to_path_buf(),
            binaries,
            copied: self.copied,
        })
    }

    /// Write readme, shims and manifest; returns the manifest binary entries
    fn write_metadata(&mut self) -> Result<Vec<String>> {
        // Fail on a missing maintainer before anything is written
        Manifest::from_package(&self.package, Vec::new())?;

        write_readme(&self.tree, &self.package)?;

        tracing::info!("Checking lib and share for executables");
        let mut binaries = collect_binaries(&self.tree, &self.package.name, &self.script)?;

        let launch_dir = self
            .pkg_root
            .join("share")
            .join(&self.package.name)
            .join("launch");
        if launch_dir.is_dir() {
            let bundler = make_bundler(self.config, self.ros, self.backends, &self.tree);
            bundler.resolve_and_copy("roslaunch", &mut self.copied)?;
            binaries.extend(write_launch_shims(
                &self.tree,
                &self.package.name,
                &launch_dir,
                &self.script,
            )?);
        }

        Manifest::from_package(&self.package, binaries.clone())?.write(&self.tree)?;
        Ok(binaries)
    }

    /// Copy the ROS prefix setup files to the same path inside the bundle
    fn copy_env_scripts(&self) -> Result<()> {
        let src_dir = host_path(self.config, self.ros.prefix());
        let dst_dir = self.tree.rebase(self.ros.prefix());
        std::fs::create_dir_all(&dst_dir)?;

        for script in ENV_SCRIPTS {
            let src = src_dir.join(script);
            if src.is_file() {
                std::fs::copy(&src, dst_dir.join(script))?;
            } else {
                tracing::warn!(path = %src, "Setup file not found, skipping");
            }
        }

        Ok(())
    }

    /// Copy `<pkg_root>/<subdir>/<package>` for every install subdirectory
    /// that has an entry for the package
    fn copy_files_from_pkg_root(&self) -> Result<()> {
        let mut subdirs = Vec::new();
        for entry in self.pkg_root.read_dir_utf8()? {
            let entry = entry?;
            if entry.path().is_dir() {
                subdirs.push(entry.file_name().to_string());
            }
        }
        subdirs.sort();

        for subdir in subdirs {
            let src = self.pkg_root.join(&subdir).join(&self.package.name);
            let dst = self.tree.install_dir().join(&subdir).join(&self.package.name);

            if src.exists() {
                let written = copy_install_tree(&src, &dst)?;
                tracing::debug!(%src, %dst, written, "Copied install space");
            }
        }

        Ok(())
    }
}

/// Run the configured packaging command on a finished bundle
pub fn pack_snap(config: &Config, workspace_root: &Utf8Path, bundle_root: &Utf8Path) -> Result<()> {
    let mut argv = config.snap.build_command.clone();
    argv.push(bundle_root.to_string());
    run_command(&argv, workspace_root, "Snap build")
}

fn find_root_package(packages: &PackageMap, package_name: &str) -> Result<Package> {
    packages.get(package_name).cloned().ok_or_else(|| {
        Error::package(
            format!("Requested package '{}' not found", package_name),
            format!(
                "Available packages: {}",
                packages.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        )
    })
}

fn make_bundler<'b>(
    config: &'b Config,
    ros: &'b RosEnvironment,
    backends: Backends<'b>,
    tree: &'b BundleTree,
) -> DependencyBundler<'b> {
    DependencyBundler::new(tree, backends.catalog, backends.resolver, backends.cache)
        .with_platform(config.resolve.platform())
        .with_policy(EcosystemPolicy::from_patterns(
            &config.resolve.ecosystem_prefixes,
            &ros.distro,
        ))
        .with_package_root(host_path(config, ros.share_dir()))
        .with_sysroot(config.resolve.sysroot.clone())
}

/// Where a host path is read from, honoring the configured sysroot
fn host_path(config: &Config, path: &Utf8Path) -> Utf8PathBuf {
    config
        .resolve
        .sysroot
        .join(path.strip_prefix("/").unwrap_or(path))
}
