//! End-to-end conversation tests: a scripted model driving a real `sh` tool
//! server through `McpManager`.
//!
//! Run with: `cargo test -p relay-core --test conversation_integration -- --ignored`

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use relay_core::{Conversation, ConversationConfig, ConversationEvent};
use relay_mcp::{McpConfig, McpManager, McpServerConfig};
use relay_permissions::{PermissionEngine, PermissionLevel, PermissionRule};
use relay_types::{
    ApiError, AssistantMessage, ChatMessage, ChatRequest, ModelClient, ModelResponse, ToolCall,
};

const EXTRACT_ID: &str =
    r#"id=$(printf '%s' "$line" | sed 's/^{"jsonrpc":"2.0","id":\([0-9]*\),.*/\1/')"#;

/// `calc` exposes `add`; every call is appended to `log_path` and answered with "5".
fn calc_server(log_path: &str) -> McpServerConfig {
    let script = format!(
        r#"while read -r line; do
  {EXTRACT_ID}
  case "$line" in
    *'"tools/list"'*) printf '{{"jsonrpc":"2.0","id":%s,"result":{{"tools":[{{"name":"add","description":"Add two numbers","inputSchema":{{"type":"object","properties":{{"a":{{"type":"number"}},"b":{{"type":"number"}}}}}}}}]}}}}\n' "$id" ;;
    *'"tools/call"'*) echo "$line" >> {log_path}; printf '{{"jsonrpc":"2.0","id":%s,"result":{{"content":[{{"type":"text","text":"5"}}],"isError":false}}}}\n' "$id" ;;
  esac
done"#
    );
    McpServerConfig {
        timeout_ms: 5000,
        ..McpServerConfig::new("sh", vec!["-c".to_string(), script])
    }
}

struct ScriptedModel {
    turns: Mutex<VecDeque<AssistantMessage>>,
}

impl ScriptedModel {
    fn new(turns: Vec<AssistantMessage>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns.into()),
        })
    }
}

impl ModelClient for ScriptedModel {
    fn complete<'a>(
        &'a self,
        _request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ModelResponse, ApiError>> + Send + 'a>> {
        let message = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| AssistantMessage::text("done"));
        Box::pin(async move {
            Ok(ModelResponse {
                message,
                usage: Default::default(),
            })
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn call(id: &str, name: &str, arguments: &str) -> AssistantMessage {
    AssistantMessage {
        tool_calls: vec![ToolCall::function(id, name, arguments)],
        ..AssistantMessage::default()
    }
}

fn last_tool_turn(conv: &Conversation) -> String {
    conv.history()
        .messages()
        .iter()
        .rev()
        .find_map(|m| match m {
            ChatMessage::Tool { content, .. } => Some(content.clone()),
            _ => None,
        })
        .unwrap()
}

async fn start(log: &std::path::Path) -> Arc<McpManager> {
    let mut config = McpConfig::default();
    config
        .servers
        .insert("calc".into(), calc_server(log.to_str().unwrap()));
    Arc::new(McpManager::start(&config).await)
}

#[tokio::test]
#[ignore]
async fn add_through_real_server_yields_exact_text() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let manager = start(&log).await;
    let model = ScriptedModel::new(vec![
        call("call_1", "add", r#"{"a":2,"b":3}"#),
        AssistantMessage::text("2 + 3 = 5"),
    ]);
    let mut conv = Conversation::new(
        model,
        manager.clone(),
        Arc::new(PermissionEngine::auto_approve()),
        ConversationConfig::default(),
    );

    assert_eq!(conv.tool_definitions()[0].name(), "add");
    let summary = conv.send("add 2 and 3", |_| {}).await.unwrap();

    assert_eq!(last_tool_turn(&conv), "5");
    assert_eq!(summary.final_text.as_deref(), Some("2 + 3 = 5"));
    let logged = std::fs::read_to_string(&log).unwrap();
    assert!(logged.contains(r#""arguments":{"a":2,"b":3}"#), "{logged}");
    manager.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn blocked_call_never_reaches_the_server() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let manager = start(&log).await;
    let model = ScriptedModel::new(vec![call("call_1", "add", r#"{"a":2,"b":3}"#)]);
    let permissions = PermissionEngine::new(
        vec![PermissionRule::new("add", PermissionLevel::Block)],
        None,
    );
    let mut conv = Conversation::new(
        model,
        manager.clone(),
        Arc::new(permissions),
        ConversationConfig::default(),
    );

    let mut rejected = 0;
    conv.send("add 2 and 3", |e| {
        if matches!(e, ConversationEvent::ToolRejected { .. }) {
            rejected += 1;
        }
    })
    .await
    .unwrap();

    assert_eq!(rejected, 1);
    assert_eq!(last_tool_turn(&conv), "Tool call blocked: rule: add -> block");
    assert!(!log.exists());
    manager.shutdown().await;
}

#[tokio::test]
#[ignore]
async fn unregistered_tool_contacts_no_process() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("calls.log");
    let manager = start(&log).await;
    let model = ScriptedModel::new(vec![call("call_1", "frobnicate", "{}")]);
    let mut conv = Conversation::new(
        model,
        manager.clone(),
        Arc::new(PermissionEngine::auto_approve()),
        ConversationConfig::default(),
    );

    conv.send("frobnicate", |_| {}).await.unwrap();

    assert_eq!(last_tool_turn(&conv), "Tool frobnicate not found");
    assert!(!log.exists());
    manager.shutdown().await;
}
