//! The model-call / tool-call loop.

use crate::context::{TurnContext, TurnSummary};
use crate::event::ConversationEvent;
use crate::history::{ConversationHistory, HistoryError};
use relay_mcp::schema::{from_invocation_result, to_invocation_request};
use relay_permissions::{PermissionEngine, SessionApprovals, Verdict};
use relay_types::{
    ChatMessage, ChatRequest, ModelClient, RelayError, ToolBackend, ToolCall, ToolDefinition,
    ToolError, ToolInvocationResult,
};
use std::sync::Arc;
use uuid::Uuid;

/// Default cap on tool-execution rounds per `send`.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 25;

/// Tool-turn content for calls left unexecuted when the round cap is hit.
pub const ROUND_LIMIT_NOTICE: &str = "Tool call not executed: tool-call round limit reached.";

/// Settings for a conversation.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: usize,
    /// Emit `Reasoning` events when the model declares reasoning output.
    pub show_reasoning: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: None,
            system_prompt: None,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            show_reasoning: false,
        }
    }
}

/// One conversation: history, the collaborators it drives, and its approvals.
pub struct Conversation {
    id: Uuid,
    model: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolBackend>,
    permissions: Arc<PermissionEngine>,
    config: ConversationConfig,
    history: ConversationHistory,
    approvals: SessionApprovals,
}

impl Conversation {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<dyn ToolBackend>,
        permissions: Arc<PermissionEngine>,
        config: ConversationConfig,
    ) -> Self {
        let history = match &config.system_prompt {
            Some(prompt) => ConversationHistory::with_system_prompt(prompt.clone()),
            None => ConversationHistory::new(),
        };
        Self {
            id: Uuid::new_v4(),
            model,
            tools,
            permissions,
            config,
            history,
            approvals: SessionApprovals::new(),
        }
    }

    /// Replace the history with saved turns (e.g. from a trace).
    pub fn resume(&mut self, messages: Vec<ChatMessage>) -> Result<(), HistoryError> {
        self.history = ConversationHistory::from_messages(messages)?;
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn approvals(&self) -> &SessionApprovals {
        &self.approvals
    }

    /// The schemas currently exposed to the model.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    /// Run one user turn to completion.
    ///
    /// Calls the model until it answers without tool calls, executing each
    /// requested call in emission order. Per-call failures become tool turns;
    /// a model failure or a fatal tool error is returned. A fatal tool error
    /// still answers every pending call first, so the history stays valid.
    pub async fn send(
        &mut self,
        input: &str,
        mut on_event: impl FnMut(ConversationEvent),
    ) -> Result<TurnSummary, RelayError> {
        let mut ctx = TurnContext::new();
        self.history.push_user(input)?;
        let capabilities = self.model.capabilities();

        loop {
            let tools = if capabilities.tool_calls {
                self.tools.definitions()
            } else {
                Vec::new()
            };
            let request = ChatRequest {
                model: self.config.model.clone(),
                messages: self.history.messages().to_vec(),
                tools,
                max_tokens: self.config.max_tokens,
            };
            tracing::debug!(
                conversation = %self.id,
                messages = request.messages.len(),
                tools = request.tools.len(),
                "Calling model {}",
                self.model.name()
            );

            let response = self.model.complete(&request).await?;
            ctx.usage.add(&response.usage);
            on_event(ConversationEvent::Usage(response.usage.clone()));

            let turn = response.message;
            let show_reasoning = capabilities.reasoning && self.config.show_reasoning;
            if let Some(reasoning) = turn.reasoning_content.as_ref().filter(|_| show_reasoning) {
                on_event(ConversationEvent::Reasoning(reasoning.clone()));
            }
            if let Some(text) = turn.content.as_ref() {
                on_event(ConversationEvent::Text(text.clone()));
            }

            let calls = turn.tool_calls.clone();
            let final_text = turn.content.clone();
            self.history.push_assistant(turn)?;

            if calls.is_empty() {
                on_event(ConversationEvent::Done);
                return Ok(ctx.finish(final_text, false));
            }

            if ctx.rounds >= self.config.max_tool_rounds {
                tracing::warn!(
                    "Tool-call round limit ({}) reached; {} call(s) not executed",
                    self.config.max_tool_rounds,
                    calls.len()
                );
                for call in &calls {
                    self.history.push_tool(&call.id, ROUND_LIMIT_NOTICE)?;
                }
                on_event(ConversationEvent::RoundLimitReached { rounds: ctx.rounds });
                return Ok(ctx.finish(final_text, true));
            }
            ctx.rounds += 1;

            for (i, call) in calls.iter().enumerate() {
                match self.run_call(call, &mut ctx, &mut on_event).await {
                    Ok(content) => self.history.push_tool(&call.id, content)?,
                    Err(err) => {
                        tracing::error!("Aborting turn on tool '{}': {err}", call.function.name);
                        let notice = format!("Tool call aborted: {err}");
                        for pending in &calls[i..] {
                            self.history.push_tool(&pending.id, notice.as_str())?;
                        }
                        return Err(err.into());
                    }
                }
            }
        }
    }

    /// Resolve one tool call into its tool-turn content.
    async fn run_call(
        &mut self,
        call: &ToolCall,
        ctx: &mut TurnContext,
        on_event: &mut dyn FnMut(ConversationEvent),
    ) -> Result<String, ToolError> {
        let name = call.function.name.clone();
        on_event(ConversationEvent::ToolRequested {
            id: call.id.clone(),
            name: name.clone(),
            arguments: call.function.arguments.clone(),
        });

        let request = match to_invocation_request(call) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!("{err}");
                ctx.skipped_calls += 1;
                let output = err.to_string();
                on_event(ConversationEvent::ToolFinished {
                    id: call.id.clone(),
                    name,
                    output: output.clone(),
                    is_error: true,
                });
                return Ok(output);
            }
        };

        let verdict = self
            .permissions
            .authorize(&request.name, &request.arguments, &mut self.approvals)
            .await;
        if let Verdict::Rejected { message } = verdict {
            ctx.skipped_calls += 1;
            on_event(ConversationEvent::ToolRejected {
                id: call.id.clone(),
                name,
                reason: message.clone(),
            });
            return Ok(message);
        }

        ctx.tool_calls += 1;
        let result = match self.tools.invoke(request).await {
            Ok(result) => result,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                tracing::warn!("Tool '{name}' failed: {err}");
                ToolInvocationResult::error(err.to_string())
            }
        };
        let output = from_invocation_result(&result);
        on_event(ConversationEvent::ToolFinished {
            id: call.id.clone(),
            name,
            output: output.clone(),
            is_error: result.is_error,
        });
        Ok(output)
    }
}
