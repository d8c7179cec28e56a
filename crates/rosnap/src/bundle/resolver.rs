//! Recursive runtime dependency resolution and copying
//!
//! Starting from a package's declared run dependencies, every key is resolved
//! to a binary package whose installed files are copied into the bundle.
//! Binary packages outside the ROS distribution are expanded into their own
//! system dependencies, so shared libraries that package.xml never mentions
//! are bundled too. ROS packages found in the install space are descended
//! into through their package.xml.
//!
//! Traversal state is a [`CopiedSet`] owned by the caller. A name enters the
//! set before it is descended into, which bounds the walk on cyclic graphs.

use camino::Utf8PathBuf;
use std::collections::BTreeSet;

use super::BundleTree;
use super::copy::copy_installed_files;
use crate::catalog::PackageCatalog;
use crate::package::Package;
use crate::system::{KeyResolver, Platform, SystemCache, SystemPackage};
use crate::Result;

/// Names already handled during one bundling run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopiedSet {
    names: BTreeSet<String>,
    payloads: Vec<String>,
    payload_names: BTreeSet<String>,
}

impl CopiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` was already processed
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Mark `name` as processed. Returns false if it already was.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Processed names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// System packages whose files were copied, in copy order
    pub fn payloads(&self) -> &[String] {
        &self.payloads
    }

    fn has_payload(&self, package: &str) -> bool {
        self.payload_names.contains(package)
    }

    fn record_payload(&mut self, package: &str) {
        if self.payload_names.insert(package.to_string()) {
            self.payloads.push(package.to_string());
        }
    }
}

/// Which binary packages belong to the build distribution itself
///
/// Those packages are not expanded into their system dependencies; the ROS
/// dependency graph already covers them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EcosystemPolicy {
    prefixes: Vec<String>,
}

impl EcosystemPolicy {
    /// Policy from prefix patterns, replacing `{distro}` with `distro`
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S], distro: &str) -> Self {
        Self {
            prefixes: patterns
                .iter()
                .map(|p| p.as_ref().replace("{distro}", distro))
                .collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `package` is part of the distribution
    pub fn is_ecosystem(&self, package: &str) -> bool {
        self.prefixes.iter().any(|p| package.starts_with(p.as_str()))
    }
}

/// Copies the transitive runtime dependencies of packages into a bundle
pub struct DependencyBundler<'a> {
    tree: &'a BundleTree,
    catalog: &'a dyn PackageCatalog,
    resolver: &'a dyn KeyResolver,
    cache: &'a dyn SystemCache,
    platform: Platform,
    policy: EcosystemPolicy,
    package_root: Utf8PathBuf,
    sysroot: Utf8PathBuf,
}

impl<'a> DependencyBundler<'a> {
    /// Create a bundler writing into `tree`
    ///
    /// Defaults: platform `ubuntu:trusty`, no ecosystem prefixes, ROS
    /// packages looked up under `/opt/ros`, files read from `/`.
    pub fn new(
        tree: &'a BundleTree,
        catalog: &'a dyn PackageCatalog,
        resolver: &'a dyn KeyResolver,
        cache: &'a dyn SystemCache,
    ) -> Self {
        Self {
            tree,
            catalog,
            resolver,
            cache,
            platform: Platform::new("ubuntu", "trusty"),
            policy: EcosystemPolicy::default(),
            package_root: Utf8PathBuf::from("/opt/ros"),
            sysroot: Utf8PathBuf::from("/"),
        }
    }

    /// Platform keys are resolved for
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Policy deciding which binary packages are not expanded
    pub fn with_policy(mut self, policy: EcosystemPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Directory whose `<name>` subdirectories hold installed ROS packages
    pub fn with_package_root(mut self, package_root: impl Into<Utf8PathBuf>) -> Self {
        self.package_root = package_root.into();
        self
    }

    /// Filesystem root installed files are read from
    pub fn with_sysroot(mut self, sysroot: impl Into<Utf8PathBuf>) -> Self {
        self.sysroot = sysroot.into();
        self
    }

    /// Bundle every transitive runtime dependency of `root`
    pub fn bundle_dependencies(&self, root: &Package) -> Result<CopiedSet> {
        let mut copied = CopiedSet::new();
        self.copy_recursive_dependencies(root, &mut copied)?;
        Ok(copied)
    }

    /// Bundle the run dependencies of `package`, sharing `copied` with the caller
    pub fn copy_recursive_dependencies(
        &self,
        package: &Package,
        copied: &mut CopiedSet,
    ) -> Result<()> {
        for dep in package.run_dependencies() {
            if !copied.insert(dep) {
                continue;
            }

            tracing::debug!(package = %package.name, dependency = dep, "Bundling run dependency");
            self.copy_resolved(dep, copied)?;

            let dep_root = self.package_root.join(dep);
            for dep_package in self.catalog.find_packages(&dep_root)?.values() {
                self.copy_recursive_dependencies(dep_package, copied)?;
            }
        }

        Ok(())
    }

    /// Resolve a single key and bundle its system package
    ///
    /// Returns whether the key counts as processed in this run. Only the first
    /// call for a key that resolves to no system package returns false; the
    /// key is marked either way, so later calls for it return true without a
    /// second lookup.
    pub fn resolve_and_copy(&self, key: &str, copied: &mut CopiedSet) -> Result<bool> {
        if !copied.insert(key) {
            return Ok(true);
        }
        self.copy_resolved(key, copied)
    }

    /// The first binary package `key` resolves to, if any
    pub fn resolve_key(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .resolver
            .resolve(key, &self.platform)?
            .into_iter()
            .next())
    }

    /// Copy only the installed files of `package`, without expanding its
    /// system dependencies. Returns the number of files copied.
    pub fn copy_payload(&self, package: &SystemPackage, copied: &mut CopiedSet) -> Result<usize> {
        if copied.has_payload(&package.name) {
            return Ok(0);
        }
        copied.record_payload(&package.name);
        copy_installed_files(self.tree, &self.sysroot, &package.installed_files)
    }

    fn copy_resolved(&self, key: &str, copied: &mut CopiedSet) -> Result<bool> {
        let Some(system_name) = self.resolve_key(key)? else {
            tracing::debug!(key, platform = %self.platform, "No system package for key, skipping");
            return Ok(false);
        };

        self.copy_system_package(&system_name, copied)?;
        Ok(true)
    }

    fn copy_system_package(&self, name: &str, copied: &mut CopiedSet) -> Result<()> {
        if copied.has_payload(name) {
            return Ok(());
        }

        let Some(package) = self.cache.package(name)? else {
            tracing::warn!(package = name, "Package not found in system cache, skipping");
            return Ok(());
        };
        copied.record_payload(name);

        let count = copy_installed_files(self.tree, &self.sysroot, &package.installed_files)?;
        tracing::debug!(package = name, files = count, "Copied system package");

        if self.policy.is_ecosystem(name) {
            return Ok(());
        }

        for dep in &package.depends {
            if copied.contains(dep) || !self.cache.contains(dep)? {
                continue;
            }
            copied.insert(dep.as_str());
            self.copy_system_package(dep, copied)?;
        }

        Ok(())
    }
}
