//! Configuration file parsing and merging
//!
//! This module handles parsing of `rosnap.toml` and `rosnap.local.toml` files
//! and resolving the ROS installation the bundle is built against.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::system::Platform;
use crate::{Error, Result};

/// Distribution used when neither the environment nor the config names one
pub const DEFAULT_DISTRO: &str = "jade";

/// Main configuration structure for rosnap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bundle output settings
    pub bundle: BundleConfig,

    /// ROS installation settings
    pub ros: RosConfig,

    /// Dependency resolution settings
    pub resolve: ResolveConfig,

    /// Source workspace settings
    pub source: SourceConfig,

    /// Snap packaging settings
    pub snap: SnapConfig,
}

/// Bundle output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Directory holding one bundle per package (default: "snappy_build")
    pub output_dir: Utf8PathBuf,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            output_dir: Utf8PathBuf::from("snappy_build"),
        }
    }
}

/// ROS installation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RosConfig {
    /// Distribution name, used when ROS_DISTRO is not set
    pub distro: Option<String>,
}

/// Dependency resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// OS name passed to rosdep (default: "ubuntu")
    pub platform: String,

    /// OS version passed to rosdep (default: "trusty")
    pub platform_version: String,

    /// Binary package prefixes that belong to the ROS distribution itself.
    /// `{distro}` is replaced with the active distribution.
    pub ecosystem_prefixes: Vec<String>,

    /// Keys always bundled when copying dependencies
    pub core_dependencies: Vec<String>,

    /// Filesystem root that installed package files are read from
    pub sysroot: Utf8PathBuf,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            platform: "ubuntu".to_string(),
            platform_version: "trusty".to_string(),
            ecosystem_prefixes: vec!["ros-{distro}-".to_string()],
            core_dependencies: ["rosclean", "rosmaster", "rosout", "rosmake"]
                .into_iter()
                .map(String::from)
                .collect(),
            sysroot: Utf8PathBuf::from("/"),
        }
    }
}

impl ResolveConfig {
    /// The platform rosdep keys are resolved for
    pub fn platform(&self) -> Platform {
        Platform::new(&self.platform, &self.platform_version)
    }
}

/// Source workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Install space of the catkin workspace (default: "install")
    pub install_dir: Utf8PathBuf,

    /// Command that builds and installs the workspace. Empty skips the build.
    pub build_command: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            install_dir: Utf8PathBuf::from("install"),
            build_command: vec!["catkin_make".to_string(), "install".to_string()],
        }
    }
}

/// Snap packaging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Packaging command; the bundle directory is appended as last argument
    pub build_command: Vec<String>,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            build_command: vec!["snappy".to_string(), "build".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from a workspace directory.
    ///
    /// This loads `rosnap.toml` and optionally merges `rosnap.local.toml` if it exists.
    pub fn load(workspace_root: &Utf8Path) -> Result<Self> {
        let config_path = workspace_root.join("rosnap.toml");
        let local_config_path = workspace_root.join("rosnap.local.toml");

        let base_config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<toml::Value>(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let local_config = if local_config_path.exists() {
            let content = std::fs::read_to_string(&local_config_path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        } else {
            None
        };

        let merged = if let Some(local) = local_config {
            merge_toml_values(base_config, local)
        } else {
            base_config
        };

        let config: Config = merged.try_into()?;
        tracing::debug!(?config, "Loaded configuration");

        Ok(config)
    }

    /// Load configuration from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Merge two TOML values:
/// - Tables: recursively merged
/// - Arrays: local replaces base (not merged)
/// - Primitives: local overrides base
fn merge_toml_values(base: toml::Value, local: toml::Value) -> toml::Value {
    match (base, local) {
        (toml::Value::Table(mut base_table), toml::Value::Table(local_table)) => {
            for (key, local_value) in local_table {
                if let Some(base_value) = base_table.remove(&key) {
                    base_table.insert(key, merge_toml_values(base_value, local_value));
                } else {
                    base_table.insert(key, local_value);
                }
            }
            toml::Value::Table(base_table)
        }
        (_, local) => local,
    }
}

/// The ROS installation a bundle is built against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosEnvironment {
    /// Value of ROS_ROOT, e.g. `/opt/ros/jade/share/ros`
    pub root: Utf8PathBuf,

    /// Distribution name, e.g. `jade`
    pub distro: String,
}

impl RosEnvironment {
    /// Build the environment from CLI/env values, falling back to the config.
    ///
    /// A missing root is fatal; a missing distro falls back to the config
    /// and then to [`DEFAULT_DISTRO`].
    pub fn resolve(
        root: Option<Utf8PathBuf>,
        distro: Option<String>,
        config: &Config,
    ) -> Result<Self> {
        let root = root.ok_or_else(|| {
            Error::config(
                "ROS_ROOT is not set",
                "Source /opt/ros/<distro>/setup.bash or pass --ros-root",
            )
        })?;

        if root.parent().and_then(Utf8Path::parent).is_none() {
            return Err(Error::config(
                format!("ROS_ROOT '{}' is too shallow", root),
                "ROS_ROOT should point at <prefix>/share/ros",
            ));
        }

        let distro = distro
            .or_else(|| config.ros.distro.clone())
            .unwrap_or_else(|| DEFAULT_DISTRO.to_string());

        Ok(Self { root, distro })
    }

    /// Directory holding one subdirectory per installed ROS package
    pub fn share_dir(&self) -> &Utf8Path {
        self.root.parent().unwrap_or(&self.root)
    }

    /// Installation prefix, e.g. `/opt/ros/jade`
    pub fn prefix(&self) -> &Utf8Path {
        let share = self.share_dir();
        share.parent().unwrap_or(share)
    }
}
