//! Permission engine: rules, session approvals, then the human.

use crate::approvals::SessionApprovals;
use crate::matcher::RuleSet;
use crate::prompt::PromptHandler;
use crate::types::*;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Tool-turn content for a call the user declined.
pub const USER_REJECTED: &str = "User rejected tool call.";

/// Final answer of the gate for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    /// The call must not run; `message` becomes the tool turn's content.
    Rejected { message: String },
}

pub struct PermissionEngine {
    rules: RuleSet,
    prompt_handler: Option<Arc<dyn PromptHandler>>,
    auto_approve: bool,
}

impl PermissionEngine {
    pub fn new(rules: Vec<PermissionRule>, prompt_handler: Option<Arc<dyn PromptHandler>>) -> Self {
        Self {
            rules: RuleSet::new(rules),
            prompt_handler,
            auto_approve: false,
        }
    }

    /// An engine that approves every call (non-interactive runs, `--yes`).
    pub fn auto_approve() -> Self {
        Self {
            rules: RuleSet::default(),
            prompt_handler: None,
            auto_approve: true,
        }
    }

    /// Decide without asking anyone.
    ///
    /// Order: auto-approve, block rules, session approvals, remaining rules,
    /// then prompt by default. A session approval never overrides a block.
    pub fn check(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
        approvals: &SessionApprovals,
    ) -> PermissionDecision {
        if self.auto_approve {
            return PermissionDecision::Permit;
        }

        let matched = self.rules.evaluate(tool_name, arguments);
        if let Some(m) = matched.as_ref().filter(|m| m.level == PermissionLevel::Block) {
            return PermissionDecision::Block {
                reason: m.description.clone(),
            };
        }

        if approvals.is_approved(tool_name) {
            return PermissionDecision::Permit;
        }

        match matched {
            Some(m) if m.level == PermissionLevel::Permit => PermissionDecision::Permit,
            Some(m) => PermissionDecision::Prompt {
                description: m.description,
            },
            None => PermissionDecision::Prompt {
                description: format!("Tool '{tool_name}' requires confirmation"),
            },
        }
    }

    /// Ask the prompt handler. Without one, the answer is deny.
    pub async fn prompt(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
        description: &str,
    ) -> PromptResponse {
        match &self.prompt_handler {
            Some(handler) => {
                handler
                    .prompt_permission(tool_name, arguments, description)
                    .await
            }
            None => PromptResponse::Deny,
        }
    }

    /// Run the whole gate for one call, recording "always allow" answers in `approvals`.
    pub async fn authorize(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
        approvals: &mut SessionApprovals,
    ) -> Verdict {
        match self.check(tool_name, arguments, approvals) {
            PermissionDecision::Permit => Verdict::Approved,
            PermissionDecision::Block { reason } => {
                tracing::info!("Tool call '{tool_name}' blocked: {reason}");
                Verdict::Rejected {
                    message: format!("Tool call blocked: {reason}"),
                }
            }
            PermissionDecision::Prompt { description } => {
                match self.prompt(tool_name, arguments, &description).await {
                    PromptResponse::AllowOnce => Verdict::Approved,
                    PromptResponse::AlwaysAllow => {
                        approvals.approve(tool_name);
                        Verdict::Approved
                    }
                    PromptResponse::Deny => Verdict::Rejected {
                        message: USER_REJECTED.to_string(),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Answers every prompt with a fixed response and counts prompts.
    struct Scripted {
        response: PromptResponse,
        asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(response: PromptResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                asked: Mutex::new(Vec::new()),
            })
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    impl PromptHandler for Scripted {
        fn prompt_permission<'a>(
            &'a self,
            tool_name: &'a str,
            _arguments: &'a Map<String, Value>,
            _description: &'a str,
        ) -> Pin<Box<dyn Future<Output = PromptResponse> + Send + 'a>> {
            self.asked.lock().unwrap().push(tool_name.to_string());
            let response = self.response;
            Box::pin(async move { response })
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn default_is_prompt() {
        let engine = PermissionEngine::new(vec![], None);
        let decision = engine.check("add", &Map::new(), &SessionApprovals::new());
        assert!(matches!(decision, PermissionDecision::Prompt { .. }));
    }

    #[test]
    fn permit_rule_skips_prompt() {
        let engine = PermissionEngine::new(
            vec![PermissionRule::new("add", PermissionLevel::Permit)],
            None,
        );
        assert_eq!(
            engine.check("add", &Map::new(), &SessionApprovals::new()),
            PermissionDecision::Permit
        );
    }

    #[test]
    fn session_approval_cannot_override_block() {
        let engine = PermissionEngine::new(
            vec![PermissionRule::new("write_file", PermissionLevel::Block).with_args("path:/etc/*")],
            None,
        );
        let mut approvals = SessionApprovals::new();
        approvals.approve("write_file");

        let blocked = engine.check("write_file", &args(json!({"path": "/etc/hosts"})), &approvals);
        assert!(matches!(blocked, PermissionDecision::Block { .. }));

        let allowed = engine.check("write_file", &args(json!({"path": "/tmp/a"})), &approvals);
        assert_eq!(allowed, PermissionDecision::Permit);
    }

    #[test]
    fn auto_approve_permits_everything() {
        let engine = PermissionEngine::auto_approve();
        assert_eq!(
            engine.check("anything", &Map::new(), &SessionApprovals::new()),
            PermissionDecision::Permit
        );
    }

    #[tokio::test]
    async fn no_handler_denies() {
        let engine = PermissionEngine::new(vec![], None);
        let verdict = engine
            .authorize("add", &Map::new(), &mut SessionApprovals::new())
            .await;
        assert_eq!(
            verdict,
            Verdict::Rejected {
                message: USER_REJECTED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn block_message_names_the_rule() {
        let engine = PermissionEngine::new(
            vec![PermissionRule::new("add", PermissionLevel::Block)],
            None,
        );
        let verdict = engine
            .authorize("add", &Map::new(), &mut SessionApprovals::new())
            .await;
        assert_eq!(
            verdict,
            Verdict::Rejected {
                message: "Tool call blocked: rule: add -> block".to_string()
            }
        );
    }

    #[tokio::test]
    async fn allow_once_asks_every_time() {
        let handler = Scripted::new(PromptResponse::AllowOnce);
        let engine = PermissionEngine::new(vec![], Some(handler.clone()));
        let mut approvals = SessionApprovals::new();

        for _ in 0..2 {
            let verdict = engine.authorize("add", &Map::new(), &mut approvals).await;
            assert_eq!(verdict, Verdict::Approved);
        }
        assert_eq!(handler.asked(), vec!["add", "add"]);
        assert!(!approvals.is_approved("add"));
    }

    #[tokio::test]
    async fn always_allow_is_remembered_for_the_session() {
        let handler = Scripted::new(PromptResponse::AlwaysAllow);
        let engine = PermissionEngine::new(vec![], Some(handler.clone()));
        let mut approvals = SessionApprovals::new();

        engine.authorize("add", &Map::new(), &mut approvals).await;
        engine.authorize("add", &Map::new(), &mut approvals).await;
        assert_eq!(handler.asked(), vec!["add"]);
        assert!(approvals.is_approved("add"));
    }

    #[tokio::test]
    async fn deny_from_handler_rejects() {
        let handler = Scripted::new(PromptResponse::Deny);
        let engine = PermissionEngine::new(vec![], Some(handler));
        let verdict = engine
            .authorize("add", &Map::new(), &mut SessionApprovals::new())
            .await;
        assert!(matches!(verdict, Verdict::Rejected { ref message } if message == USER_REJECTED));
    }
}
