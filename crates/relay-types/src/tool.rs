//! Tool-protocol types and the backend trait the conversation loop calls into.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::ToolDefinition;
use crate::error::ToolError;

/// Text used in place of an empty tool result; some model servers reject
/// tool turns with empty content.
pub const EMPTY_RESULT_PLACEHOLDER: &str = "(empty tool result)";

/// A tool discovered on a tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    /// Name of the configured server that exposes this tool.
    pub server: String,
}

/// A single `tools/call` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub name: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// The outcome of a `tools/call` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolInvocationResult {
    /// Create a successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Create an error text result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: true,
        }
    }
}

/// One typed part of a tool result. Only text parts reach the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    #[serde(other)]
    Other,
}

/// Where the conversation loop sends tool calls.
///
/// Uses `Pin<Box<dyn Future>>` so implementations can sit behind `Arc<dyn ToolBackend>`.
pub trait ToolBackend: Send + Sync {
    /// Function schemas for every exposed tool, in a stable order.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Route a call to the tool that owns `request.name`.
    ///
    /// Per-call failures come back as `Ok` results with `is_error` set; `Err`
    /// is reserved for failures that must stop the turn.
    fn invoke(
        &self,
        request: ToolInvocationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ToolInvocationResult, ToolError>> + Send + '_>>;
}
