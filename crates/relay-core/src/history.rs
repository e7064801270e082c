//! Append-only conversation history that keeps tool turns correlated.

use relay_types::{AssistantMessage, ChatMessage, RelayError};
use thiserror::Error;

/// A turn that would make the history invalid for the chat protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("tool turn '{id}' does not answer any pending tool call")]
    OrphanedToolTurn { id: String },

    #[error("{} tool call(s) still unanswered: {}", pending.len(), pending.join(", "))]
    UnansweredToolCalls { pending: Vec<String> },
}

impl From<HistoryError> for RelayError {
    fn from(err: HistoryError) -> Self {
        RelayError::Protocol(err.to_string())
    }
}

/// Ordered turns of one conversation.
///
/// Turns are never edited once appended. Tool-call ids announced by an
/// assistant turn stay pending until a tool turn answers them; user and
/// assistant turns are refused while any call is pending.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    pending: Vec<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history opening with a system turn.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
            pending: Vec::new(),
        }
    }

    /// Rebuild a history from saved turns, validating them in order.
    pub fn from_messages(messages: Vec<ChatMessage>) -> Result<Self, HistoryError> {
        let mut history = Self::new();
        for message in messages {
            match message {
                ChatMessage::Assistant(turn) => history.push_assistant(turn)?,
                ChatMessage::Tool {
                    tool_call_id,
                    content,
                } => history.push_tool(tool_call_id, content)?,
                ChatMessage::User { content } => history.push_user(content)?,
                system @ ChatMessage::System { .. } => history.messages.push(system),
            }
        }
        Ok(history)
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> Result<(), HistoryError> {
        self.ensure_settled()?;
        self.messages.push(ChatMessage::user(content));
        Ok(())
    }

    /// Append an assistant turn verbatim; its tool-call ids become pending.
    pub fn push_assistant(&mut self, turn: AssistantMessage) -> Result<(), HistoryError> {
        self.ensure_settled()?;
        self.pending = turn.tool_calls.iter().map(|c| c.id.clone()).collect();
        self.messages.push(ChatMessage::Assistant(turn));
        Ok(())
    }

    /// Answer a pending tool call.
    pub fn push_tool(
        &mut self,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), HistoryError> {
        let id = tool_call_id.into();
        let Some(pos) = self.pending.iter().position(|p| *p == id) else {
            return Err(HistoryError::OrphanedToolTurn { id });
        };
        self.pending.remove(pos);
        self.messages.push(ChatMessage::tool(id, content));
        Ok(())
    }

    /// Tool-call ids announced but not yet answered, in emission order.
    pub fn pending_tool_calls(&self) -> &[String] {
        &self.pending
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    fn ensure_settled(&self) -> Result<(), HistoryError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(HistoryError::UnansweredToolCalls {
                pending: self.pending.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::{Role, ToolCall};

    fn calls(ids: &[&str]) -> AssistantMessage {
        AssistantMessage {
            tool_calls: ids
                .iter()
                .map(|id| ToolCall::function(*id, "add", "{}"))
                .collect(),
            ..AssistantMessage::default()
        }
    }

    #[test]
    fn tool_turns_answer_pending_calls_in_any_order() {
        let mut history = ConversationHistory::new();
        history.push_user("add things").unwrap();
        history.push_assistant(calls(&["c1", "c2"])).unwrap();
        history.push_tool("c2", "7").unwrap();
        history.push_tool("c1", "5").unwrap();
        assert!(history.pending_tool_calls().is_empty());
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn orphaned_tool_turn_is_rejected() {
        let mut history = ConversationHistory::new();
        history.push_user("hi").unwrap();
        let err = history.push_tool("ghost", "boo").unwrap_err();
        assert_eq!(err, HistoryError::OrphanedToolTurn { id: "ghost".into() });
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn answered_call_cannot_be_answered_twice() {
        let mut history = ConversationHistory::new();
        history.push_assistant(calls(&["c1"])).unwrap();
        history.push_tool("c1", "5").unwrap();
        assert!(history.push_tool("c1", "5").is_err());
    }

    #[test]
    fn user_turn_waits_for_pending_calls() {
        let mut history = ConversationHistory::new();
        history.push_assistant(calls(&["c1", "c2"])).unwrap();
        history.push_tool("c1", "5").unwrap();
        let err = history.push_user("next").unwrap_err();
        assert_eq!(
            err,
            HistoryError::UnansweredToolCalls {
                pending: vec!["c2".into()]
            }
        );
        assert_eq!(err.to_string(), "1 tool call(s) still unanswered: c2");
    }

    #[test]
    fn system_prompt_opens_history() {
        let history = ConversationHistory::with_system_prompt("be brief");
        assert_eq!(history.messages()[0].role(), Role::System);
    }

    #[test]
    fn from_messages_validates_saved_turns() {
        let good = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("add 2 and 3"),
            ChatMessage::Assistant(calls(&["c1"])),
            ChatMessage::tool("c1", "5"),
            ChatMessage::Assistant(AssistantMessage::text("5")),
        ];
        let history = ConversationHistory::from_messages(good.clone()).unwrap();
        assert_eq!(history.into_messages(), good);

        let orphan = vec![ChatMessage::user("hi"), ChatMessage::tool("c9", "x")];
        assert!(ConversationHistory::from_messages(orphan).is_err());
    }

    #[test]
    fn history_error_becomes_protocol_error() {
        let err: RelayError = HistoryError::OrphanedToolTurn { id: "c1".into() }.into();
        assert!(matches!(err, RelayError::Protocol(_)));
    }
}
