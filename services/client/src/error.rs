//! services/client/src/error.rs
//!
//! Defines the top-level error type of the client.

use crate::config::ConfigError;
use crate::controller::{AuthError, NavigationError, OrderError, PlaybackError};

/// The primary error type for the `client` crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Represents a failure to build the HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
