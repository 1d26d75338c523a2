//! Error types for Lipi
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Lipi operations
///
/// Covers configuration loading, credential checks, generation parameter
/// validation, and failures of the remote inference call.
#[derive(Error, Debug)]
pub enum LipiError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (API calls, stream error events, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Authentication errors (e.g., 401 Unauthorized)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// No credential has been supplied for the session
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// A token was supplied but does not have the expected shape
    #[error("Invalid API token: {0}")]
    InvalidCredential(String),

    /// The provider accepted the prediction but offered no stream URL
    #[error("Streaming is not supported by this provider")]
    StreamingNotSupported,

    /// The transcript already ends with an assistant turn
    #[error("No response is owed: the last turn is already from the assistant")]
    ResponseNotOwed,

    /// A generation parameter is outside its valid range
    #[error("Invalid value for {name}: {value} ({reason})")]
    InvalidParameter {
        /// Parameter name (temperature, top_p, max_length)
        name: String,
        /// The rejected value as entered
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Line editor errors
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}

/// Result type alias for Lipi operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
