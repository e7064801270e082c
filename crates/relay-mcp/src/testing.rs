//! Mock tool servers written as `sh -c` scripts, shared by the unit tests.

use crate::config::{McpConfig, McpServerConfig};

/// Extracts the numeric request id from a request line.
const EXTRACT_ID: &str = r#"id=$(printf '%s' "$line" | sed 's/^{"jsonrpc":"2.0","id":\([0-9]*\),.*/\1/')"#;

fn sh(script: String) -> McpServerConfig {
    McpServerConfig {
        timeout_ms: 5000,
        ..McpServerConfig::new("sh", vec!["-c".to_string(), script])
    }
}

/// A server answering `tools/list` with `tools_json` and every `tools/call` with `call_result_json`.
pub fn scripted_server(tools_json: &str, call_result_json: &str) -> McpServerConfig {
    sh(format!(
        r#"while read -r line; do
  {EXTRACT_ID}
  case "$line" in
    *'"tools/list"'*) printf '{{"jsonrpc":"2.0","id":%s,"result":{{"tools":{tools_json}}}}}\n' "$id" ;;
    *'"tools/call"'*) printf '{{"jsonrpc":"2.0","id":%s,"result":{call_result_json}}}\n' "$id" ;;
  esac
done"#
    ))
}

/// The `calc` server: one `add` tool that always answers "5".
pub fn calc_server() -> McpServerConfig {
    scripted_server(
        r#"[{"name":"add","description":"Add two numbers","inputSchema":{"type":"object","properties":{"a":{"type":"number"},"b":{"type":"number"}}}}]"#,
        r#"{"content":[{"type":"text","text":"5"}],"isError":false}"#,
    )
}

/// A server that answers every request with a JSON-RPC error.
pub fn error_server() -> McpServerConfig {
    sh(format!(
        r#"while read -r line; do
  {EXTRACT_ID}
  printf '{{"jsonrpc":"2.0","id":%s,"error":{{"code":-32601,"message":"Method not found"}}}}\n' "$id"
done"#
    ))
}

/// A server that reads one request and exits without answering.
pub fn exiting_server() -> McpServerConfig {
    sh("read -r line; exit 0".to_string())
}

/// A server whose command does not exist.
pub fn missing_server() -> McpServerConfig {
    McpServerConfig::new("relay_missing_command_xyz123", vec![])
}

pub fn config_of(servers: Vec<(&str, McpServerConfig)>) -> McpConfig {
    McpConfig {
        servers: servers
            .into_iter()
            .map(|(name, config)| (name.to_string(), config))
            .collect(),
    }
}
