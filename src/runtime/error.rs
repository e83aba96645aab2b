//! Error types for container runtime calls.

use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors reported by a [`ContainerRuntime`](super::ContainerRuntime).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The daemon could not be reached.
    #[error("Docker not available: {reason}")]
    DockerNotAvailable {
        /// Reason why Docker is unavailable.
        reason: String,
    },

    /// The image does not exist locally and was not pulled.
    #[error("Image '{image}' not found")]
    ImageNotFound {
        /// Image reference.
        image: String,
    },

    /// Pulling the image failed.
    #[error("Failed to pull image '{image}': {reason}")]
    ImagePullFailed {
        /// Image reference.
        image: String,
        /// Reason for failure.
        reason: String,
    },

    /// Another container already uses the name.
    #[error("Container name '{name}' is already in use")]
    NameConflict {
        /// Container name.
        name: String,
    },

    /// The daemon refused to create the container.
    #[error("Failed to create container '{name}': {reason}")]
    CreationFailed {
        /// Container name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The container was created but would not start.
    #[error("Failed to start container '{name}': {reason}")]
    StartFailed {
        /// Container name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The container does not exist (or no longer exists).
    #[error("Container '{name}' not found")]
    NotFound {
        /// Container name.
        name: String,
    },

    /// Any other failed call against an existing container.
    #[error("Failed to {operation} container '{name}': {reason}")]
    Request {
        /// What was being attempted ("kill", "remove", ...).
        operation: &'static str,
        /// Container name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid client or request configuration.
    #[error("Runtime configuration error: {reason}")]
    Config {
        /// Reason for error.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// True when the container is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound { .. })
    }
}
