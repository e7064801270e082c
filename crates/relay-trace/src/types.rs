//! The trace record.

use chrono::{DateTime, Utc};
use relay_types::{AssistantMessage, ChatMessage, ToolDefinition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Characters of the first user message used in a trace file name.
const FILE_STEM_CHARS: usize = 30;

/// A saved conversation: full history plus the tool schemas the model saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

impl Trace {
    pub fn new(
        id: Uuid,
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            model: model.into(),
            messages,
            tools,
        }
    }

    pub fn first_user_message(&self) -> Option<&str> {
        self.messages.iter().find_map(|m| match m {
            ChatMessage::User { content } => Some(content.as_str()),
            _ => None,
        })
    }

    /// `<first user message, sanitized>_<YYYYmmdd_HHMMSS>.json`, or `None`
    /// when the conversation never had a user turn.
    pub fn file_name(&self) -> Option<String> {
        let first = self.first_user_message()?;
        let stem: String = first
            .chars()
            .take(FILE_STEM_CHARS)
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        Some(format!(
            "{}_{}.json",
            stem.trim_matches('_'),
            self.timestamp.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Split the history before its last assistant turn.
    ///
    /// Returns the turns a model saw when it produced that answer, plus the
    /// answer itself. Without any assistant turn the whole history is the prefix.
    pub fn replay_prefix(&self) -> (&[ChatMessage], Option<&AssistantMessage>) {
        let last = self
            .messages
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, m)| match m {
                ChatMessage::Assistant(turn) => Some((i, turn)),
                _ => None,
            });
        match last {
            Some((i, turn)) => (&self.messages[..i], Some(turn)),
            None => (&self.messages, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use relay_types::ToolCall;

    fn trace(messages: Vec<ChatMessage>) -> Trace {
        let mut trace = Trace::new(Uuid::new_v4(), "gpt-4o", messages, vec![]);
        trace.timestamp = Utc.with_ymd_and_hms(2026, 10, 19, 14, 5, 9).unwrap();
        trace
    }

    #[test]
    fn file_name_from_first_user_message() {
        let t = trace(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("What's 2 + 3? Please use the calculator tool"),
            ChatMessage::user("ignored"),
        ]);
        assert_eq!(
            t.file_name().as_deref(),
            Some("What_s_2___3__Please_use_the_c_20261019_140509.json")
        );
    }

    #[test]
    fn file_name_trims_separators() {
        let t = trace(vec![ChatMessage::user("  hello!  ")]);
        assert_eq!(t.file_name().as_deref(), Some("hello_20261019_140509.json"));
    }

    #[test]
    fn no_user_message_no_file_name() {
        let t = trace(vec![ChatMessage::system("be brief")]);
        assert_eq!(t.file_name(), None);
    }

    #[test]
    fn replay_prefix_stops_before_last_answer() {
        let call_turn = AssistantMessage {
            tool_calls: vec![ToolCall::function("c1", "add", r#"{"a":2,"b":3}"#)],
            ..AssistantMessage::default()
        };
        let t = trace(vec![
            ChatMessage::user("add 2 and 3"),
            ChatMessage::Assistant(call_turn),
            ChatMessage::tool("c1", "5"),
            ChatMessage::Assistant(AssistantMessage::text("5")),
        ]);
        let (prefix, answer) = t.replay_prefix();
        assert_eq!(prefix.len(), 3);
        assert_eq!(answer.and_then(|a| a.content.as_deref()), Some("5"));
    }

    #[test]
    fn replay_prefix_without_answer_is_everything() {
        let t = trace(vec![ChatMessage::user("hi")]);
        let (prefix, answer) = t.replay_prefix();
        assert_eq!(prefix.len(), 1);
        assert!(answer.is_none());
    }
}
