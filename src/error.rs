//! Error types for Scout
//!
//! Provides standardized error handling across the core. Nothing in here is
//! fatal to a host process: scan and cache failures degrade to fewer results,
//! and launch-safety rejections are surfaced as plain values.

use thiserror::Error;

/// Errors that can occur in Scout
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Package manifest or activity enumeration errors
    #[error("Package error: {0}")]
    Package(String),

    /// Foreign-package resource resolution errors
    #[error("Resource error: {0}")]
    Resource(String),

    /// Contacts provider access errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Shortcut descriptor XML errors
    #[error("Descriptor parse error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Result type alias for Scout operations
pub type ScoutResult<T> = Result<T, ScoutError>;
