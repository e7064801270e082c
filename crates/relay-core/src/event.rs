use relay_types::Usage;

/// Progress reported by `Conversation::send` while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    /// Reasoning text, only when the model declares it and display is enabled.
    Reasoning(String),
    /// Free text from an assistant turn.
    Text(String),
    ToolRequested {
        id: String,
        name: String,
        /// The JSON argument string as the model emitted it.
        arguments: String,
    },
    ToolFinished {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    ToolRejected {
        id: String,
        name: String,
        reason: String,
    },
    RoundLimitReached {
        rounds: usize,
    },
    Usage(Usage),
    Done,
}
