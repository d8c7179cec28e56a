//! Error types for rosnap

// This warning is a false positive from thiserror macro expansion
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for rosnap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rosnap
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// XML parsing error
    #[error("Failed to parse XML: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    /// XML reading error
    #[error("Failed to read XML: {0}")]
    XmlRead(#[from] quick_xml::Error),

    /// YAML serialization error
    #[error("Failed to serialize YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(help("{help}"))]
    Config { message: String, help: String },

    /// Package error
    #[error("Package error: {message}")]
    #[diagnostic(help("{help}"))]
    Package { message: String, help: String },

    /// Package catalog error
    #[error("Catalog error: {message}")]
    #[diagnostic(help("{help}"))]
    Catalog { message: String, help: String },

    /// Dependency key resolution error
    #[error("Resolve error: {message}")]
    #[diagnostic(help("{help}"))]
    Resolve { message: String, help: String },

    /// Bundle layout or copy error
    #[error("Bundle error: {message}")]
    #[diagnostic(help("{help}"))]
    Bundle { message: String, help: String },

    /// External process error
    #[error("Process error: {message}")]
    #[diagnostic(help("{help}"))]
    Process { message: String, help: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a package error
    pub fn package(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Package {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Catalog {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a resolve error
    pub fn resolve(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a bundle error
    pub fn bundle(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Bundle {
            message: message.into(),
            help: help.into(),
        }
    }

    /// Create a process error
    pub fn process(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
            help: help.into(),
        }
    }
}
