//! rosnap CLI - bundle ROS packages as snaps

use clap::Parser;
use miette::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rosnap::commands;

/// rosnap - bundle a ROS package and its runtime dependencies as a snap
#[derive(Debug, Parser)]
#[command(name = "rosnap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace root directory
    #[arg(short = 'w', long, global = true)]
    workspace: Option<String>,

    #[command(flatten)]
    bundle: commands::bundle::BundleArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Determine workspace root
    let workspace_root = if let Some(ref path) = cli.workspace {
        camino::Utf8PathBuf::from(path)
    } else {
        std::env::current_dir()
            .ok()
            .and_then(|p| camino::Utf8PathBuf::try_from(p).ok())
            .unwrap_or_else(|| camino::Utf8PathBuf::from("."))
    };

    commands::bundle::run(&workspace_root, cli.bundle)
}
