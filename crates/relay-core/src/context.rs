//! Per-`send` bookkeeping.

use relay_types::Usage;

/// State for one `Conversation::send` call. Created fresh each time so
/// nothing leaks between turns.
#[derive(Debug, Default)]
pub struct TurnContext {
    /// Tool-execution rounds completed.
    pub rounds: usize,
    /// Calls that reached the tool backend.
    pub tool_calls: usize,
    /// Calls refused by the gate or never run because their arguments were malformed.
    pub skipped_calls: usize,
    pub usage: Usage,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self, final_text: Option<String>, hit_round_limit: bool) -> TurnSummary {
        TurnSummary {
            rounds: self.rounds,
            tool_calls: self.tool_calls,
            skipped_calls: self.skipped_calls,
            usage: self.usage,
            final_text,
            hit_round_limit,
        }
    }
}

/// What one `send` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnSummary {
    pub rounds: usize,
    pub tool_calls: usize,
    pub skipped_calls: usize,
    pub usage: Usage,
    /// Text of the last assistant turn, if it had any.
    pub final_text: Option<String>,
    /// The turn ended because `max_tool_rounds` was reached.
    pub hit_round_limit: bool,
}
