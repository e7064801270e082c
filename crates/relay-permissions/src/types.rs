//! Core types for the confirmation gate.

use serde::{Deserialize, Serialize};

/// What a matching rule does to a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Permit,
    Block,
    Prompt,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Permit => "permit",
            PermissionLevel::Block => "block",
            PermissionLevel::Prompt => "prompt",
        }
    }

    /// Higher wins when several rules match: block > permit > prompt.
    pub(crate) fn priority(&self) -> u8 {
        match self {
            PermissionLevel::Block => 2,
            PermissionLevel::Permit => 1,
            PermissionLevel::Prompt => 0,
        }
    }
}

/// A rule matching a tool name glob and an optional argument pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Tool name or glob (e.g. `add`, `browser_*`, `*`).
    pub tool: String,
    /// Optional `field:glob` argument matcher (e.g. `path:/tmp/*`).
    #[serde(default)]
    pub args: Option<String>,
    pub level: PermissionLevel,
}

impl PermissionRule {
    pub fn new(tool: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            tool: tool.into(),
            args: None,
            level,
        }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = Some(args.into());
        self
    }

    /// Human-readable form used in block notices.
    pub fn describe(&self) -> String {
        match &self.args {
            Some(args) => format!("rule: {} [{}] -> {}", self.tool, args, self.level.as_str()),
            None => format!("rule: {} -> {}", self.tool, self.level.as_str()),
        }
    }
}

/// Outcome of evaluating rules and approvals for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    Permit,
    Block { reason: String },
    Prompt { description: String },
}

/// A human's answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    AllowOnce,
    /// Allow this tool for the rest of the conversation.
    AlwaysAllow,
    Deny,
}
