//! Prompt handler trait for interactive confirmation.

use crate::types::PromptResponse;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

/// Asks a human whether a tool call may run.
///
/// Uses `Pin<Box<dyn Future>>` so handlers can sit behind `Arc<dyn PromptHandler>`.
pub trait PromptHandler: Send + Sync {
    fn prompt_permission<'a>(
        &'a self,
        tool_name: &'a str,
        arguments: &'a Map<String, Value>,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = PromptResponse> + Send + 'a>>;
}
