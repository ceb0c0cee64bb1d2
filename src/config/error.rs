//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Upstream base URL must start with http:// or https://")]
    InvalidUpstreamUrl,

    #[error("Upstream timeout must be between 1 and 600 seconds")]
    InvalidUpstreamTimeout,

    #[error("Session idle window must be longer than the sweep interval")]
    InvalidIdleWindow,
}
