//! Crate-level error types that are not tied to a single module.

use thiserror::Error;

/// Errors raised while resolving configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Environment variable name.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// An env file could not be read or parsed.
    #[error("Failed to read env file {path}: {reason}")]
    EnvFile {
        /// File that was being read.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// A variable is present but not valid unicode.
    #[error("Environment variable {key} is not valid unicode")]
    NotUnicode {
        /// Environment variable name.
        key: String,
    },
}
