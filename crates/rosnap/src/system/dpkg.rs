//! dpkg-backed system package cache

use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::collections::HashMap;
use std::process::{Command, Output};

use super::{SystemCache, SystemPackage};
use crate::{Error, Result};

/// System cache that queries the dpkg database with `dpkg-query`
///
/// Lookups are memoized for the lifetime of the cache, so one instance
/// should be opened per bundling run and dropped at the end of it.
#[derive(Debug)]
pub struct DpkgCache {
    program: String,
    entries: RefCell<HashMap<String, Option<SystemPackage>>>,
}

impl Default for DpkgCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DpkgCache {
    pub fn new() -> Self {
        Self {
            program: "dpkg-query".to_string(),
            entries: RefCell::new(HashMap::new()),
        }
    }

    fn query(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.program).args(args).output().map_err(|e| {
            Error::resolve(
                format!("Failed to run {}: {}", self.program, e),
                "rosnap needs a dpkg-based system to look up installed packages",
            )
        })
    }

    fn load(&self, name: &str) -> Result<Option<SystemPackage>> {
        let status = self.query(&["-W", "-f=${Package}\t${Pre-Depends}\t${Depends}\n", name])?;
        if !status.status.success() {
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&status.stdout);
        // Multi-arch packages print one line per architecture; they share dependencies
        let Some(line) = stdout.lines().next() else {
            return Ok(None);
        };
        let mut fields = line.splitn(3, '\t').skip(1);
        let pre_depends = fields.next().unwrap_or_default();
        let depends = fields.next().unwrap_or_default();

        let mut all_depends = parse_depends(pre_depends);
        for dep in parse_depends(depends) {
            if !all_depends.contains(&dep) {
                all_depends.push(dep);
            }
        }

        let listing = self.query(&["-L", name])?;
        let installed_files = if listing.status.success() {
            String::from_utf8_lossy(&listing.stdout)
                .lines()
                .filter(|line| line.starts_with('/'))
                .map(Utf8PathBuf::from)
                .collect()
        } else {
            Vec::new()
        };

        Ok(Some(SystemPackage {
            name: name.to_string(),
            installed_files,
            depends: all_depends,
        }))
    }
}

impl SystemCache for DpkgCache {
    fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.package(name)?.is_some())
    }

    fn package(&self, name: &str) -> Result<Option<SystemPackage>> {
        if let Some(entry) = self.entries.borrow().get(name) {
            return Ok(entry.clone());
        }

        let entry = self.load(name)?;
        self.entries
            .borrow_mut()
            .insert(name.to_string(), entry.clone());
        Ok(entry)
    }
}

/// Parse a Debian `Depends` field into package names
///
/// Only the first alternative of each `a | b` group is kept, and version
/// constraints and architecture qualifiers are dropped.
pub fn parse_depends(field: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for group in field.split(',') {
        let Some(first) = group.split('|').next() else {
            continue;
        };
        let Some(name) = first.split_whitespace().next() else {
            continue;
        };
        let name = name.split(':').next().unwrap_or(name);
        let name = name.split('(').next().unwrap_or(name);

        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_depends_strips_versions() {
        assert_eq!(
            parse_depends("libc6 (>= 2.14), libstdc++6 (>= 4.1.1)"),
            vec!["libc6", "libstdc++6"]
        );
    }

    #[test]
    fn test_parse_depends_keeps_first_alternative() {
        assert_eq!(
            parse_depends("libgcc1 (>= 1:4.1.1) | libgcc-s1, debconf"),
            vec!["libgcc1", "debconf"]
        );
    }

    #[test]
    fn test_parse_depends_drops_arch_qualifier() {
        assert_eq!(parse_depends("python:any (>= 2.7.5-5~)"), vec!["python"]);
    }

    #[test]
    fn test_parse_depends_empty_and_duplicates() {
        assert!(parse_depends("").is_empty());
        assert_eq!(parse_depends("zlib1g, zlib1g (>= 1:1.2)"), vec!["zlib1g"]);
    }
}
