//! Core error types for the lookout workspace.
//!
//! `LookoutError` is the error surface of the shared types and of the
//! collaborator traits in [`crate::pipeline`]; configuration problems get
//! their own `ConfigError` so the binary can report them before any
//! browser is launched.

use thiserror::Error;

/// Central error type for shared lookout operations.
#[derive(Error, Debug)]
pub enum LookoutError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid post, malformed link)
    #[error("validation error: {0}")]
    Validation(String),

    /// The intent pipeline could not assess a post
    #[error("intent pipeline error: {0}")]
    Pipeline(String),

    /// The persistence sink rejected a record
    #[error("persistence error: {0}")]
    Persistence(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Explicitly requested config file does not exist
    #[error("config file not found at {path}")]
    NotFound {
        /// Path where config was expected
        path: String,
    },

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `LookoutError`.
pub type Result<T> = std::result::Result<T, LookoutError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
