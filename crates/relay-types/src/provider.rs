//! The model collaborator seam.

use crate::{ApiError, ChatRequest, ModelResponse};
use std::future::Future;
use std::pin::Pin;

/// What a model client supports, declared up front rather than probed per response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    /// The endpoint accepts function schemas and may answer with tool calls.
    pub tool_calls: bool,
    /// Responses may carry a separate `reasoning_content` field.
    pub reasoning: bool,
}

impl Default for ModelCapabilities {
    fn default() -> Self {
        Self {
            tool_calls: true,
            reasoning: false,
        }
    }
}

/// A chat-completion client: given history and tool schemas, return one assistant turn.
///
/// Dyn-compatible so the conversation engine works with `Arc<dyn ModelClient>`.
pub trait ModelClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, ApiError>> + Send + 'a>>;

    fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities::default()
    }

    /// Client name for logging (e.g., "openai").
    fn name(&self) -> &str;
}
