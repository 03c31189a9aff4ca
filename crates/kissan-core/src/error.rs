//! Core error types for kissan-core.
//!
//! The engagement engine itself never returns these to its host; they are
//! used by configuration, credential storage and the reward client, and are
//! converted into notifications at the engine boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for kissan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Reward API errors
    #[error("Reward error: {0}")]
    Reward(#[from] RewardError),

    /// Credential store errors
    #[error("Credential store error: {0}")]
    Credentials(#[from] keyring::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Failures of the "issue daily engagement reward" call.
#[derive(Error, Debug)]
pub enum RewardError {
    /// No user is signed in, so there is no identity to reward.
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Transport-level failure (DNS, TLS, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered 2xx but refused the reward
    #[error("Reward rejected: {0}")]
    Rejected(String),

    /// Response body did not have the expected shape
    #[error("Invalid reward response: {0}")]
    InvalidResponse(String),

    /// Endpoint URL could not be built from configuration
    #[error("Invalid reward endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
