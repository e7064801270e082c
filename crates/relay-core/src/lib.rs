//! Conversation engine for Relay.
//!
//! Interleaves model turns with tool-call turns, gating every call through
//! the permission engine and keeping the history protocol-valid.

pub mod context;
pub mod conversation;
pub mod event;
pub mod history;

pub use context::{TurnContext, TurnSummary};
pub use conversation::{Conversation, ConversationConfig};
pub use event::ConversationEvent;
pub use history::{ConversationHistory, HistoryError};
