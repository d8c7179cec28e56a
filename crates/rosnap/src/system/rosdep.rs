//! rosdep-backed key resolution

use std::process::Command;

use super::{KeyResolver, Platform};
use crate::{Error, Result};

/// Resolves keys by running `rosdep resolve`
#[derive(Debug, Clone)]
pub struct RosdepResolver {
    program: String,
    distro: String,
}

impl RosdepResolver {
    /// Resolver for the given ROS distribution
    pub fn new(distro: impl Into<String>) -> Self {
        Self {
            program: "rosdep".to_string(),
            distro: distro.into(),
        }
    }
}

impl KeyResolver for RosdepResolver {
    fn resolve(&self, key: &str, platform: &Platform) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .arg("resolve")
            .arg(key)
            .arg(format!("--os={}", platform))
            .arg(format!("--rosdistro={}", self.distro))
            .output()
            .map_err(|e| {
                Error::resolve(
                    format!("Failed to run {}: {}", self.program, e),
                    "Install python-rosdep and run 'rosdep init && rosdep update'",
                )
            })?;

        if !output.status.success() {
            tracing::debug!(
                key,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "rosdep could not resolve key"
            );
            return Ok(Vec::new());
        }

        Ok(parse_resolve_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse the output of `rosdep resolve`
///
/// The output alternates installer headers (`#apt`) with whitespace-separated
/// package names.
pub fn parse_resolve_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(str::split_whitespace)
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_package() {
        assert_eq!(
            parse_resolve_output("#apt\nros-jade-roscpp\n"),
            vec!["ros-jade-roscpp"]
        );
    }

    #[test]
    fn test_parse_multiple_packages() {
        let output = "#apt\nlibboost-thread-dev libboost-system-dev\n";
        assert_eq!(
            parse_resolve_output(output),
            vec!["libboost-thread-dev", "libboost-system-dev"]
        );
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_resolve_output("").is_empty());
        assert!(parse_resolve_output("#apt\n\n").is_empty());
    }
}
