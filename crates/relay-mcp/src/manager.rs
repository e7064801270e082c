//! McpManager: the supervisor plus the current registry snapshot, exposed as a tool backend.

use crate::config::McpConfig;
use crate::registry::{NameConflict, RegisteredTool, ToolRegistry};
use crate::supervisor::Supervisor;
use relay_types::{
    ToolBackend, ToolDefinition, ToolError, ToolInvocationRequest, ToolInvocationResult,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Routes model tool calls to the tool servers that own them.
pub struct McpManager {
    supervisor: Supervisor,
    registry: RwLock<ToolRegistry>,
}

impl McpManager {
    /// Start the configured servers and discover their tools.
    ///
    /// A server that fails discovery or cannot be launched is skipped with a
    /// warning and contributes no tools.
    pub async fn start(config: &McpConfig) -> Self {
        let supervisor = Supervisor::new(config);
        let mut registry = ToolRegistry::new();
        registry.rebuild(&supervisor).await;

        for (name, count) in server_counts(&supervisor, &registry) {
            tracing::info!("Tool server '{name}' ready ({count} tools)");
        }

        Self {
            supervisor,
            registry: RwLock::new(registry),
        }
    }

    /// Rediscover tools on every server and swap in the new snapshot.
    pub async fn reload(&self) {
        let mut fresh = ToolRegistry::new();
        fresh.rebuild(&self.supervisor).await;
        *self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    /// All exposed tools, in discovery order.
    pub fn tools(&self) -> Vec<RegisteredTool> {
        self.read_registry().iter().cloned().collect()
    }

    /// Configured servers and how many tools each contributes.
    pub fn server_summary(&self) -> Vec<(String, usize)> {
        server_counts(&self.supervisor, &self.read_registry())
    }

    /// Exposed-name collisions found by the last discovery.
    pub fn conflicts(&self) -> Vec<NameConflict> {
        self.read_registry().conflicts().to_vec()
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Stop every tool server. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await;
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, ToolRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn server_counts(supervisor: &Supervisor, registry: &ToolRegistry) -> Vec<(String, usize)> {
    supervisor
        .server_names()
        .map(|name| {
            let count = registry
                .iter()
                .filter(|t| t.descriptor.server == name)
                .count();
            (name.to_string(), count)
        })
        .collect()
}

impl ToolBackend for McpManager {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.read_registry().definitions()
    }

    fn invoke(
        &self,
        request: ToolInvocationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ToolInvocationResult, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let route = {
                let registry = self.read_registry();
                registry
                    .resolve(&request.name)
                    .map(|d| (d.server.clone(), d.name.clone()))
            };
            let (server, tool_name) = match route {
                Ok(route) => route,
                Err(e) => {
                    tracing::warn!("{e}");
                    return Ok(ToolInvocationResult::error(e.to_string()));
                }
            };

            let routed = ToolInvocationRequest {
                name: tool_name,
                arguments: request.arguments,
            };
            self.supervisor
                .invoke(&server, &routed)
                .await
                .map_err(|e| e.into_tool_error(&server))
        })
    }
}
