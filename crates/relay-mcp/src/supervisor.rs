//! Tool server supervisor: one lazily started process per configured server.
//!
//! Each server moves through `NotStarted -> Running -> Stopped`. Access to a
//! server's streams is serialized by a per-server lock, so concurrent callers
//! above this layer never interleave lines on one process.

use crate::config::{McpConfig, McpServerConfig};
use crate::error::McpError;
use crate::jsonrpc::JsonRpcMessage;
use crate::transport::ServerProcess;
use futures_util::future::join_all;
use relay_types::{ToolDescriptor, ToolInvocationRequest, ToolInvocationResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Request id of the first `tools/list` sent to a freshly started server.
///
/// Any later discovery on the same process (a `/reload`) draws a fresh id like
/// a call does, so a late answer to an earlier, timed-out `tools/list` is
/// skipped as stale rather than taken for the new one.
pub const DISCOVERY_REQUEST_ID: u64 = 1;

/// Content of the synthetic result for a call that got no answer.
pub const NO_RESPONSE: &str = "No response";

/// How long a server gets to exit after stdin closes and SIGTERM before it is killed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Lifecycle state of a configured server, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    NotStarted,
    Running,
    Stopped,
}

enum ServerState {
    NotStarted,
    Running(ServerProcess),
    Stopped,
}

impl ServerState {
    fn status(&self) -> ServerStatus {
        match self {
            ServerState::NotStarted => ServerStatus::NotStarted,
            ServerState::Running(_) => ServerStatus::Running,
            ServerState::Stopped => ServerStatus::Stopped,
        }
    }
}

struct ServerSlot {
    config: McpServerConfig,
    state: Mutex<ServerState>,
}

#[derive(Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ToolEntry>,
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_schema", rename = "inputSchema")]
    input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Owns every configured tool-server process.
pub struct Supervisor {
    servers: BTreeMap<String, ServerSlot>,
    next_id: AtomicU64,
}

impl Supervisor {
    /// Register the configured servers. Nothing is spawned until first use.
    pub fn new(config: &McpConfig) -> Self {
        let servers = config
            .servers
            .iter()
            .map(|(name, server_config)| {
                let slot = ServerSlot {
                    config: server_config.clone(),
                    state: Mutex::new(ServerState::NotStarted),
                };
                (name.clone(), slot)
            })
            .collect();

        Self {
            servers,
            next_id: AtomicU64::new(DISCOVERY_REQUEST_ID + 1),
        }
    }

    /// Configured server names, in name order.
    pub fn server_names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    /// Current lifecycle state of `server`, or `None` if it is not configured.
    pub async fn status(&self, server: &str) -> Option<ServerStatus> {
        let slot = self.servers.get(server)?;
        Some(slot.state.lock().await.status())
    }

    /// List the tools `server` exposes.
    ///
    /// Any failure to get a usable answer is logged and yields no tools. Only
    /// a failure to launch the process (or an unknown server name) is an error.
    pub async fn discover_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, McpError> {
        let slot = self.slot(server)?;
        let mut state = slot.state.lock().await;
        let process = match ensure_running(server, &slot.config, &mut state) {
            Ok(process) => process,
            Err(e @ McpError::ServerStopped { .. }) => {
                tracing::warn!("Discovery skipped: {e}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let id = if process.is_fresh() {
            DISCOVERY_REQUEST_ID
        } else {
            self.next_id.fetch_add(1, Ordering::Relaxed)
        };
        let response = match process
            .request(id, "tools/list", serde_json::json!({}))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Tool discovery on '{server}' failed: {e}");
                return Ok(Vec::new());
            }
        };

        if let Some(err) = response.error {
            tracing::warn!("Tool server '{server}' rejected tools/list: {err}");
            return Ok(Vec::new());
        }

        let Some(result) = response.result else {
            tracing::warn!("Tool server '{server}' answered tools/list without a result");
            return Ok(Vec::new());
        };

        let list: ToolsListResult = match serde_json::from_value(result) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Malformed tools/list result from '{server}': {e}");
                return Ok(Vec::new());
            }
        };

        let tools: Vec<ToolDescriptor> = list
            .tools
            .into_iter()
            .map(|entry| ToolDescriptor {
                name: entry.name,
                description: entry.description.unwrap_or_default(),
                input_schema: entry.input_schema,
                server: server.to_string(),
            })
            .collect();

        tracing::info!("Tool server '{server}' exposes {} tools", tools.len());
        Ok(tools)
    }

    /// Call one tool on `server` and wait for its single answer.
    ///
    /// Every per-call failure comes back as an `is_error` result so the model
    /// can see it. `Err` means the server could not be launched at all.
    pub async fn invoke(
        &self,
        server: &str,
        request: &ToolInvocationRequest,
    ) -> Result<ToolInvocationResult, McpError> {
        let slot = self.slot(server)?;
        let mut state = slot.state.lock().await;
        let process = match ensure_running(server, &slot.config, &mut state) {
            Ok(process) => process,
            Err(e @ McpError::ServerStopped { .. }) => {
                return Ok(ToolInvocationResult::error(e.to_string()));
            }
            Err(e) => return Err(e),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let params = serde_json::json!({
            "name": request.name,
            "arguments": request.arguments,
        });

        let result = match process.request(id, "tools/call", params).await {
            Ok(response) => call_result(server, response),
            Err(McpError::NoResponse { .. }) => {
                tracing::warn!("Tool server '{server}' gave no response to '{}'", request.name);
                ToolInvocationResult::error(NO_RESPONSE)
            }
            Err(e) => {
                tracing::warn!("Call to '{}' on '{server}' failed: {e}", request.name);
                ToolInvocationResult::error(e.to_string())
            }
        };
        Ok(result)
    }

    /// Stop every running server: close stdin and terminate, wait briefly, then kill.
    ///
    /// Servers that never started are marked stopped too, so nothing can be
    /// launched after shutdown.
    pub async fn shutdown(&self) {
        let stops = self.servers.iter().map(|(name, slot)| async move {
            let previous = std::mem::replace(&mut *slot.state.lock().await, ServerState::Stopped);
            if let ServerState::Running(process) = previous {
                process.shutdown(SHUTDOWN_GRACE).await;
                tracing::debug!("Tool server '{name}' stopped");
            }
        });
        join_all(stops).await;
    }

    fn slot(&self, server: &str) -> Result<&ServerSlot, McpError> {
        self.servers.get(server).ok_or_else(|| McpError::UnknownServer {
            name: server.to_string(),
        })
    }
}

/// Start the server if it has not been started yet and hand out its process.
fn ensure_running<'a>(
    name: &str,
    config: &McpServerConfig,
    state: &'a mut ServerState,
) -> Result<&'a mut ServerProcess, McpError> {
    if matches!(state, ServerState::NotStarted) {
        *state = ServerState::Running(ServerProcess::spawn(name, config)?);
        tracing::info!("Started tool server '{name}'");
    }
    match state {
        ServerState::Running(process) => Ok(process),
        _ => Err(McpError::ServerStopped {
            name: name.to_string(),
        }),
    }
}

fn call_result(server: &str, response: JsonRpcMessage) -> ToolInvocationResult {
    if let Some(err) = response.error {
        return ToolInvocationResult::error(err.to_string());
    }
    let Some(result) = response.result else {
        return ToolInvocationResult::error(format!(
            "Tool server '{server}' answered without a result"
        ));
    };
    serde_json::from_value(result).unwrap_or_else(|e| {
        tracing::warn!("Malformed tools/call result from '{server}': {e}");
        ToolInvocationResult::error(format!("Malformed tools/call result from '{server}': {e}"))
    })
}
