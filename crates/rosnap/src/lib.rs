//! rosnap - bundle ROS packages as snaps
//!
//! This crate provides both a library and CLI for rosnap, including:
//! - Configuration file parsing and merging
//! - Package discovery and package.xml parsing
//! - Runtime key resolution through rosdep and the dpkg database
//! - Recursive dependency bundling into a snap directory tree
//! - Launcher shims and snap metadata generation

pub mod builder;
pub mod bundle;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod error;
pub mod package;
pub mod process;
pub mod system;

pub use error::{Error, Result};
