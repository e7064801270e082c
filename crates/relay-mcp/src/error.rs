//! Error types for tool-server operations.

use relay_types::ToolError;
use thiserror::Error;

/// Errors from tool-server communication.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn tool server '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },

    #[error("Unknown tool server '{name}'")]
    UnknownServer { name: String },

    #[error("Tool server '{name}' has been stopped")]
    ServerStopped { name: String },

    #[error("Tool server '{name}' closed its output without responding")]
    NoResponse { name: String },

    #[error("Tool server '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("Protocol error from '{name}': {message}")]
    Protocol { name: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Convert into the conversation-facing error for a call routed to `server`.
    pub fn into_tool_error(self, server: &str) -> ToolError {
        match self {
            McpError::SpawnFailed { name, source } => ToolError::LaunchFailed {
                server: name,
                message: source.to_string(),
            },
            McpError::UnknownServer { name } => ToolError::UnknownServer { server: name },
            _ => ToolError::Unresponsive {
                server: server.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failure_becomes_launch_failure() {
        let err = McpError::SpawnFailed {
            name: "calc".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let tool_err = err.into_tool_error("calc");
        assert!(tool_err.is_fatal());
        assert!(matches!(tool_err, ToolError::LaunchFailed { ref server, .. } if server == "calc"));
    }

    #[test]
    fn no_response_becomes_unresponsive() {
        let err = McpError::NoResponse { name: "calc".into() };
        let tool_err = err.into_tool_error("calc");
        assert!(!tool_err.is_fatal());
    }
}
