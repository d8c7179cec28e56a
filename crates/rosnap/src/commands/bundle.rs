//! Bundle command implementation
//!
//! This module provides the CLI interface for turning a ROS package into a
//! snap bundle.

use crate::builder::{Backends, BuildOptions, SnapBuilder, pack_snap};
use crate::catalog::FilesystemCatalog;
use crate::config::{Config, RosEnvironment};
use crate::system::{DpkgCache, RosdepResolver};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Args};
use clap::builder::BoolishValueParser;
use miette::{IntoDiagnostic, Result};

/// Arguments for the bundle command
#[derive(Debug, Args)]
pub struct BundleArgs {
    /// ROS package to bundle
    pub package: String,

    /// Bundle the installed binary package instead of building the workspace
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        default_value = "false",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub debs: bool,

    /// Generate snap metadata and launcher shims
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        default_value = "true",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub metadata_generate: bool,

    /// Copy all recursive run dependencies into the bundle
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        default_value = "true",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub copy_dependencies: bool,

    /// Run the snap packaging tool on the finished bundle
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        default_value = "true",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub snap_build: bool,

    /// ROS installation, e.g. /opt/ros/jade/share/ros
    #[arg(long, env = "ROS_ROOT")]
    pub ros_root: Option<Utf8PathBuf>,

    /// ROS distribution name
    #[arg(long, env = "ROS_DISTRO")]
    pub ros_distro: Option<String>,
}

impl BundleArgs {
    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            generate_metadata: self.metadata_generate,
            copy_dependencies: self.copy_dependencies,
        }
    }
}

/// Run the bundle command
pub fn run(workspace_root: &Utf8Path, args: BundleArgs) -> Result<()> {
    let config = Config::load(workspace_root).into_diagnostic()?;
    let ros = RosEnvironment::resolve(args.ros_root.clone(), args.ros_distro.clone(), &config)
        .into_diagnostic()?;

    tracing::info!(
        package = %args.package,
        ros_root = %ros.root,
        distro = %ros.distro,
        from_debs = args.debs,
        "Bundling package"
    );

    let report = {
        let catalog = FilesystemCatalog;
        let resolver = RosdepResolver::new(ros.distro.clone());
        let cache = DpkgCache::new();
        let backends = Backends {
            catalog: &catalog,
            resolver: &resolver,
            cache: &cache,
        };

        let builder = if args.debs {
            SnapBuilder::prepare_from_debs(workspace_root, &args.package, &config, &ros, backends)
        } else {
            SnapBuilder::prepare_from_source(workspace_root, &args.package, &config, &ros, backends)
        }
        .into_diagnostic()?;

        builder.build(&args.build_options()).into_diagnostic()?
    };

    tracing::info!(
        bundle = %report.bundle_root,
        binaries = report.binaries.len(),
        dependencies = report.copied.len(),
        "Bundle ready"
    );

    if args.snap_build {
        pack_snap(&config, workspace_root, &report.bundle_root).into_diagnostic()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        args: BundleArgs,
    }

    #[test]
    fn test_flag_defaults() {
        let cli = TestCli::try_parse_from(["rosnap", "talker"]).unwrap();

        assert_eq!(cli.args.package, "talker");
        assert!(!cli.args.debs);
        assert!(cli.args.metadata_generate);
        assert!(cli.args.copy_dependencies);
        assert!(cli.args.snap_build);
    }

    #[test]
    fn test_boolish_flag_values() {
        let cli = TestCli::try_parse_from([
            "rosnap", "talker", "--debs", "yes", "-m", "0", "--copy-dependencies", "no", "-s",
            "false",
        ])
        .unwrap();

        assert!(cli.args.debs);
        assert!(!cli.args.metadata_generate);
        assert!(!cli.args.copy_dependencies);
        assert!(!cli.args.snap_build);
        assert_eq!(
            cli.args.build_options(),
            BuildOptions {
                generate_metadata: false,
                copy_dependencies: false,
            }
        );
    }

    #[test]
    fn test_bare_flag_means_true() {
        let cli = TestCli::try_parse_from(["rosnap", "talker", "-d"]).unwrap();
        assert!(cli.args.debs);
    }

    #[test]
    fn test_missing_package_is_usage_error() {
        assert!(TestCli::try_parse_from(["rosnap"]).is_err());
    }

    #[test]
    fn test_invalid_flag_value() {
        assert!(TestCli::try_parse_from(["rosnap", "talker", "--debs", "maybe"]).is_err());
    }
}
