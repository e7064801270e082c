//! "Always allow" decisions scoped to one conversation.

use std::collections::BTreeSet;

/// Tools the user has approved for the rest of a conversation.
///
/// Owned by the conversation, so a new conversation starts with a clean slate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionApprovals {
    tools: BTreeSet<String>,
}

impl SessionApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approve(&mut self, tool_name: impl Into<String>) {
        self.tools.insert(tool_name.into());
    }

    pub fn is_approved(&self, tool_name: &str) -> bool {
        self.tools.contains(tool_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.tools.clear();
    }
}
