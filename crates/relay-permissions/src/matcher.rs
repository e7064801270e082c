//! Rule matching with globs compiled once up front.

use crate::types::{PermissionLevel, PermissionRule};
use globset::{Glob, GlobMatcher};
use serde_json::{Map, Value};

/// A glob, or a literal when the pattern is not a valid glob.
#[derive(Debug, Clone)]
enum Pattern {
    Any,
    Glob(GlobMatcher),
    Literal(String),
}

impl Pattern {
    fn compile(pattern: &str) -> Self {
        if pattern == "*" {
            return Pattern::Any;
        }
        match Glob::new(pattern) {
            Ok(glob) => Pattern::Glob(glob.compile_matcher()),
            Err(e) => {
                tracing::warn!("Invalid glob '{pattern}' in permission rule, matching literally: {e}");
                Pattern::Literal(pattern.to_string())
            }
        }
    }

    fn is_match(&self, candidate: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Glob(matcher) => matcher.is_match(candidate),
            Pattern::Literal(literal) => literal == candidate,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: PermissionRule,
    tool: Pattern,
    /// `None` when the rule has no argument pattern; `Some(None)` when the
    /// pattern is malformed and the rule can never match.
    args: Option<Option<(String, Pattern)>>,
}

impl CompiledRule {
    fn new(rule: PermissionRule) -> Self {
        let args = rule.args.as_deref().map(|pattern| match pattern.split_once(':') {
            Some((field, glob)) => Some((field.to_string(), Pattern::compile(glob))),
            None => {
                tracing::warn!("Argument pattern '{pattern}' lacks a 'field:' prefix; rule ignored");
                None
            }
        });
        Self {
            tool: Pattern::compile(&rule.tool),
            args,
            rule,
        }
    }

    fn matches(&self, tool_name: &str, arguments: &Map<String, Value>) -> bool {
        if !self.tool.is_match(tool_name) {
            return false;
        }
        match &self.args {
            None => true,
            Some(None) => false,
            Some(Some((field, pattern))) => match arguments.get(field) {
                Some(Value::String(s)) => pattern.is_match(s),
                Some(Value::Null) | None => false,
                Some(other) => pattern.is_match(&other.to_string()),
            },
        }
    }
}

/// The rule that decided a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub level: PermissionLevel,
    pub description: String,
}

/// An ordered set of permission rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self {
            rules: rules.into_iter().map(CompiledRule::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The highest-priority matching rule (block > permit > prompt). Among
    /// equal priorities the first rule listed wins.
    pub fn evaluate(&self, tool_name: &str, arguments: &Map<String, Value>) -> Option<RuleMatch> {
        self.rules
            .iter()
            .filter(|r| r.matches(tool_name, arguments))
            .fold(None::<&CompiledRule>, |best, r| match best {
                Some(b) if b.rule.level.priority() >= r.rule.level.priority() => Some(b),
                _ => Some(r),
            })
            .map(|winner| RuleMatch {
                level: winner.rule.level,
                description: winner.rule.describe(),
            })
    }
}
