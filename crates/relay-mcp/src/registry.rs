//! Snapshot of every discovered tool, keyed by the name the model sees.

use crate::schema::to_outbound_schema;
use crate::supervisor::Supervisor;
use relay_types::{ToolDefinition, ToolDescriptor, ToolError};
use std::collections::HashMap;

/// A discovered tool together with its translated function schema.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub definition: ToolDefinition,
}

impl RegisteredTool {
    /// The (possibly truncated) name the model calls this tool by.
    pub fn exposed_name(&self) -> &str {
        self.definition.name()
    }
}

/// Two tools that ended up with the same exposed name. The first one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    pub name: String,
    /// `server/tool` of the tool that stays exposed.
    pub kept: String,
    /// `server/tool` of the tool that is hidden.
    pub dropped: String,
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
    conflicts: Vec<NameConflict>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from descriptors in discovery order.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    fn insert(&mut self, descriptor: ToolDescriptor) {
        let definition = to_outbound_schema(&descriptor);
        let name = definition.name().to_string();

        if let Some(&existing) = self.index.get(&name) {
            let conflict = NameConflict {
                name,
                kept: qualified(&self.tools[existing].descriptor),
                dropped: qualified(&descriptor),
            };
            tracing::warn!(
                "Tool name conflict on '{}': keeping {}, dropping {}",
                conflict.name,
                conflict.kept,
                conflict.dropped
            );
            self.conflicts.push(conflict);
            return;
        }

        self.index.insert(name, self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            definition,
        });
    }

    /// Rediscover tools on every configured server, one server at a time.
    ///
    /// A server whose discovery fails, including one that cannot be launched,
    /// contributes nothing; the others are still discovered.
    pub async fn rebuild(&mut self, supervisor: &Supervisor) {
        let mut discovered = Vec::new();
        for server in supervisor.server_names() {
            match supervisor.discover_tools(server).await {
                Ok(tools) => discovered.extend(tools),
                Err(e) => tracing::warn!("Could not list tools from '{server}': {e}"),
            }
        }
        *self = Self::from_descriptors(discovered);
        tracing::info!("Tool registry holds {} tools", self.tools.len());
    }

    /// Look up a tool by the name the model used.
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, ToolError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i].descriptor)
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
            })
    }

    /// Outbound function schemas, in discovery order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn conflicts(&self) -> &[NameConflict] {
        &self.conflicts
    }
}

fn qualified(descriptor: &ToolDescriptor) -> String {
    format!("{}/{}", descriptor.server, descriptor.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::ServerStatus;
    use crate::testing::{calc_server, config_of, error_server, missing_server, scripted_server};
    use serde_json::json;

    fn descriptor(server: &str, name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
            server: server.to_string(),
        }
    }

    fn names(registry: &ToolRegistry) -> Vec<String> {
        registry.iter().map(|t| t.exposed_name().to_string()).collect()
    }

    #[test]
    fn resolve_routes_to_owning_server() {
        let registry = ToolRegistry::from_descriptors(vec![
            descriptor("calc", "add"),
            descriptor("files", "read_file"),
        ]);
        assert_eq!(registry.resolve("read_file").unwrap().server, "files");
        assert_eq!(registry.resolve("add").unwrap().server, "calc");
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let registry = ToolRegistry::from_descriptors(vec![descriptor("calc", "add")]);
        let err = registry.resolve("frobnicate").unwrap_err();
        assert_eq!(err.to_string(), "Tool frobnicate not found");
        assert!(!err.is_fatal());
    }

    #[test]
    fn truncated_names_resolve_to_original() {
        let long = format!("{}_suffix", "x".repeat(70));
        let registry = ToolRegistry::from_descriptors(vec![descriptor("srv", &long)]);
        let exposed = "x".repeat(64);
        assert_eq!(registry.resolve(&exposed).unwrap().name, long);
        assert_eq!(registry.definitions()[0].name(), exposed);
    }

    #[test]
    fn truncation_collision_is_recorded_and_first_wins() {
        let prefix = "y".repeat(64);
        let registry = ToolRegistry::from_descriptors(vec![
            descriptor("one", &format!("{prefix}_first")),
            descriptor("two", &format!("{prefix}_second")),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve(&prefix).unwrap().server, "one");

        let conflicts = registry.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].name, prefix);
        assert_eq!(conflicts[0].kept, format!("one/{prefix}_first"));
        assert_eq!(conflicts[0].dropped, format!("two/{prefix}_second"));
    }

    #[test]
    fn same_name_on_two_servers_conflicts() {
        let registry =
            ToolRegistry::from_descriptors(vec![descriptor("a", "search"), descriptor("b", "search")]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.conflicts().len(), 1);
    }

    #[test]
    fn empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.definitions().is_empty());
        assert!(registry.conflicts().is_empty());
    }

    #[tokio::test]
    async fn rebuild_skips_failing_servers() {
        let supervisor = Supervisor::new(&config_of(vec![
            ("broken", error_server()),
            ("calc", calc_server()),
        ]));
        let mut registry = ToolRegistry::new();
        registry.rebuild(&supervisor).await;
        assert_eq!(names(&registry), vec!["add"]);
        assert_eq!(registry.resolve("add").unwrap().server, "calc");
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let files = scripted_server(
            r#"[{"name":"read_file","inputSchema":{"type":"object"}},{"name":"list_dir"}]"#,
            r#"{"content":[]}"#,
        );
        let supervisor = Supervisor::new(&config_of(vec![("calc", calc_server()), ("files", files)]));
        let mut registry = ToolRegistry::new();

        registry.rebuild(&supervisor).await;
        let first = names(&registry);
        registry.rebuild(&supervisor).await;
        let second = names(&registry);

        assert_eq!(first, vec!["add", "read_file", "list_dir"]);
        assert_eq!(first, second);
        assert_eq!(registry.definitions().len(), 3);
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn rebuild_survives_a_server_that_cannot_launch() {
        let supervisor = Supervisor::new(&config_of(vec![
            ("calc", calc_server()),
            ("ghost", missing_server()),
        ]));
        let mut registry = ToolRegistry::from_descriptors(vec![descriptor("old", "stale")]);
        registry.rebuild(&supervisor).await;
        assert_eq!(names(&registry), vec!["add"]);
        assert_eq!(supervisor.status("ghost").await, Some(ServerStatus::NotStarted));
        supervisor.shutdown().await;
    }
}
