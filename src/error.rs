//! Error types for toolchat
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur while serving a chat turn
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid or inconsistent configuration, detected at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or more required secrets are absent from the environment
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingSecrets(Vec<String>),

    /// Malformed inbound request (e.g. no message)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The model asked for a tool the registry does not know
    #[error("Function {0} not found.")]
    UnknownTool(String),

    /// Language model communication failure
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model kept requesting tools past the round ceiling
    #[error("Tool round limit exceeded: model still requesting tools after {0} rounds")]
    RoundLimitExceeded(u32),

    /// The turn did not finish in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML config parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ChatError {
    /// Whether the failure was caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(self, ChatError::InvalidRequest(_))
    }
}

/// Result type alias for toolchat operations
pub type Result<T> = std::result::Result<T, ChatError>;
