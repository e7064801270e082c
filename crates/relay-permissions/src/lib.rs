//! Confirmation gate for tool calls.
//!
//! Rules carry a level (permit / block / prompt) and match on tool name plus an
//! optional `field:glob` argument pattern. Anything no rule decides is put to
//! the [`PromptHandler`], or denied when there is none.

pub mod approvals;
pub mod engine;
pub mod matcher;
pub mod prompt;
pub mod types;

pub use approvals::SessionApprovals;
pub use engine::{PermissionEngine, USER_REJECTED, Verdict};
pub use matcher::{RuleMatch, RuleSet};
pub use prompt::PromptHandler;
pub use types::*;
