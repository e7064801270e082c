//! Request and response bodies of the `/chat/completions` endpoint.

use relay_types::{
    AssistantMessage, ChatMessage, ChatRequest, ModelResponse, ToolCall, ToolDefinition, Usage,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OutboundMessage<'a>>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> CompletionRequest<'a> {
    /// Build the wire body. Tool schemas are only sent when `send_tools` is set.
    pub(crate) fn new(request: &'a ChatRequest, send_tools: bool) -> Self {
        let tools: &[ToolDefinition] = if send_tools { &request.tools } else { &[] };
        Self {
            model: &request.model,
            messages: request.messages.iter().map(OutboundMessage::from).collect(),
            tools,
            tool_choice: (!tools.is_empty()).then_some("auto"),
            max_tokens: request.max_tokens,
        }
    }
}

/// A history turn as sent to the endpoint. Reasoning stays behind.
#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OutboundMessage<'a> {
    System {
        content: &'a str,
    },
    User {
        content: &'a str,
    },
    Assistant {
        content: Option<&'a str>,
        #[serde(skip_serializing_if = "<[_]>::is_empty")]
        tool_calls: &'a [ToolCall],
    },
    Tool {
        tool_call_id: &'a str,
        content: &'a str,
    },
}

impl<'a> From<&'a ChatMessage> for OutboundMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        match message {
            ChatMessage::System { content } => OutboundMessage::System { content },
            ChatMessage::User { content } => OutboundMessage::User { content },
            ChatMessage::Assistant(turn) => OutboundMessage::Assistant {
                content: turn.content.as_deref(),
                tool_calls: &turn.tool_calls,
            },
            ChatMessage::Tool {
                tool_call_id,
                content,
            } => OutboundMessage::Tool {
                tool_call_id,
                content,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

impl CompletionResponse {
    /// The first choice as one assistant turn, or `None` if there were no choices.
    pub(crate) fn into_model_response(self) -> Option<ModelResponse> {
        let choice = self.choices.into_iter().next()?;
        let mut message = choice.message;
        // Blank strings carry nothing; keep history free of them.
        message.content = message.content.filter(|c| !c.is_empty());
        message.reasoning_content = message.reasoning_content.filter(|r| !r.trim().is_empty());
        Some(ModelResponse {
            message,
            usage: self.usage.unwrap_or_default(),
        })
    }
}
