//! Error types for tagloop
//!
//! Centralized error handling using thiserror. `GatewayError` covers the
//! failures that can happen during a single tick; they are logged and
//! swallowed by the poller. `TagloopError` covers everything else.

use thiserror::Error;

/// Failures talking to the IoT gateway
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Connection refused, DNS failure, timeout, broken body stream
    #[error("Transport error: {0}")]
    Transport(String),

    /// Gateway answered with a non-success status
    #[error("Protocol error: HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    /// Body could not be decoded or lacks the expected entries
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Short label used in log lines and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Transport(_) => "transport",
            GatewayError::Protocol { .. } => "protocol",
            GatewayError::MalformedResponse(_) => "malformed",
        }
    }
}

/// All error types that can occur in tagloop
#[derive(Debug, Error)]
pub enum TagloopError {
    /// Gateway request failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML config parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Background task panicked or was aborted
    #[error("Task error: {0}")]
    Task(String),
}

/// Result type alias for tagloop operations
pub type Result<T> = std::result::Result<T, TagloopError>;
