//! Error types for the chat front end.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and credential errors. All of these are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required API tokens: {}", .names.join(", "))]
    MissingCredentials { names: Vec<String> },

    #[error("Failed to parse secrets file {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the agent router facade.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Failed to initialize agent: {reason}")]
    Init { reason: String },

    #[error("Request to agent router failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Agent router returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response from agent router: {reason}")]
    InvalidResponse { reason: String },

    #[error("Agent router did not answer within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Agent router crashed: {reason}")]
    Internal { reason: String },
}

/// Session lookup errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: Uuid },

    #[error("Invalid session ID: {0}")]
    InvalidId(String),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
