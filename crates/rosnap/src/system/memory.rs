//! In-memory resolver and cache backed by fixtures

use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::collections::HashMap;

use super::{KeyResolver, Platform, SystemCache, SystemPackage};
use crate::Result;

/// Key resolver with a fixed key to package-name table
///
/// The table is platform independent.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResolver {
    keys: HashMap<String, Vec<String>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `key` to a single binary package
    pub fn with_key(mut self, key: impl Into<String>, package: impl Into<String>) -> Self {
        self.keys.insert(key.into(), vec![package.into()]);
        self
    }
}

impl KeyResolver for InMemoryResolver {
    fn resolve(&self, key: &str, _platform: &Platform) -> Result<Vec<String>> {
        Ok(self.keys.get(key).cloned().unwrap_or_default())
    }
}

/// System cache with fixture packages
///
/// Every [`SystemCache::package`] lookup is recorded so tests can assert how
/// often a package was fetched.
#[derive(Debug, Default)]
pub struct InMemorySystemCache {
    packages: HashMap<String, SystemPackage>,
    lookups: RefCell<Vec<String>>,
}

impl InMemorySystemCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package with its installed files and dependencies
    pub fn with_package<F, D>(mut self, name: &str, files: F, depends: D) -> Self
    where
        F: IntoIterator,
        F::Item: Into<Utf8PathBuf>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        self.packages.insert(
            name.to_string(),
            SystemPackage {
                name: name.to_string(),
                installed_files: files.into_iter().map(Into::into).collect(),
                depends: depends.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Names passed to [`SystemCache::package`], in call order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }
}

impl SystemCache for InMemorySystemCache {
    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.packages.contains_key(name))
    }

    fn package(&self, name: &str) -> Result<Option<SystemPackage>> {
        self.lookups.borrow_mut().push(name.to_string());
        Ok(self.packages.get(name).cloned())
    }
}
