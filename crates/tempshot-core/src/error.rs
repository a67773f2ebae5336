//! Core error types for tempshot-core.
//!
//! Nothing in here is fatal. Overlay failures degrade to "no prompt shown",
//! bridge failures to "no outcome delivered"; both read as user inaction to
//! the application.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tempshot-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The overlay capability is missing; nothing was shown.
    #[error("Overlay permission not granted")]
    PermissionDenied,

    /// Overlay session errors
    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the overlay presenter.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// The prompt surface refused to attach; no session was started.
    #[error("Overlay surface unavailable for artifact '{artifact_id}': {source}")]
    SurfaceUnavailable {
        artifact_id: String,
        #[source]
        source: SurfaceError,
    },

    /// A selection named a label that is not in the duration catalog.
    #[error("Unknown duration option: '{0}'")]
    UnknownOption(String),
}

/// Errors raised by a [`Surface`](crate::overlay::Surface) implementation.
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// The overlay capability has not been granted.
    #[error("Overlay permission not granted")]
    PermissionDenied,

    /// The surface was already removed when teardown reached it.
    #[error("Surface already detached")]
    Detached,

    /// Rendering backend IO failure
    #[error("Surface IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
