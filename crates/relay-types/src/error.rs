//! Error hierarchy for Relay.

use thiserror::Error;

/// Top-level error type for all Relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Model call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Conversation protocol violation: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors from the chat-completion endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Server error: {status} {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// Errors from routing or executing a tool call.
///
/// Only `LaunchFailed` and `UnknownServer` stop a conversation turn; everything
/// else is folded into a tool turn so the model can react to it.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool {name} not found")]
    NotFound { name: String },

    #[error("Malformed arguments for tool '{tool}': {message}")]
    MalformedArguments { tool: String, message: String },

    #[error("Tool server '{server}' did not respond")]
    Unresponsive { server: String },

    #[error("Failed to launch tool server '{server}': {message}")]
    LaunchFailed { server: String, message: String },

    #[error("Unknown tool server '{server}'")]
    UnknownServer { server: String },
}

impl ToolError {
    /// Whether this error must abort the current turn instead of becoming a tool turn.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolError::LaunchFailed { .. } | ToolError::UnknownServer { .. }
        )
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    MissingKey { key: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
