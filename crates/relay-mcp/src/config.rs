//! Configuration types for tool servers.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

fn default_timeout() -> u64 {
    30000
}

/// Top-level tool-server configuration.
///
/// Accepts both `servers` (TOML settings) and `mcpServers` (the common JSON
/// config-file shape). Servers are kept in name order so discovery is
/// deterministic across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default, alias = "mcpServers")]
    pub servers: BTreeMap<String, McpServerConfig>,
}

/// Launch configuration for a single tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Command to run (e.g., "npx", "python").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables, merged over the current environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// How long to wait for one response line, in milliseconds (default: 30000).
    #[serde(default = "default_timeout", alias = "timeoutMs")]
    pub timeout_ms: u64,
}

impl McpServerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: HashMap::new(),
            timeout_ms: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_server_gets_default_timeout() {
        let config: McpConfig = toml::from_str(
            r#"
[servers.calc]
command = "python"
args = ["-m", "calc_server"]
"#,
        )
        .unwrap();
        let calc = &config.servers["calc"];
        assert_eq!(calc.command, "python");
        assert_eq!(calc.args, vec!["-m", "calc_server"]);
        assert_eq!(calc.timeout_ms, 30000);
    }

    #[test]
    fn toml_server_with_env_and_timeout() {
        let config: McpConfig = toml::from_str(
            r#"
[servers.browser]
command = "npx"
args = ["@playwright/mcp@latest", "--headless"]
env = { PLAYWRIGHT_BROWSERS_PATH = "/opt/browsers" }
timeout_ms = 120000
"#,
        )
        .unwrap();
        let browser = &config.servers["browser"];
        assert_eq!(browser.env["PLAYWRIGHT_BROWSERS_PATH"], "/opt/browsers");
        assert_eq!(browser.timeout_ms, 120000);
    }

    #[test]
    fn json_timeout_accepts_camel_case() {
        let config: McpConfig = serde_json::from_str(
            r#"{"mcpServers": {"slow": {"command": "sleepy", "timeoutMs": 500}}}"#,
        )
        .unwrap();
        assert_eq!(config.servers["slow"].timeout_ms, 500);
    }

    #[test]
    fn parse_json_mcp_servers_shape() {
        let json = r#"{
            "mcpServers": {
                "playwright": {"command": "npx", "args": ["@playwright/mcp@latest"]},
                "calc": {"command": "python", "args": ["calc.py"], "env": {"DEBUG": "1"}}
            }
        }"#;
        let config: McpConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers["calc"].env["DEBUG"], "1");
        // Name order, not file order.
        let names: Vec<&str> = config.servers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["calc", "playwright"]);
    }

    #[test]
    fn args_default_to_empty() {
        let config: McpConfig =
            serde_json::from_str(r#"{"mcpServers": {"echo": {"command": "cat"}}}"#).unwrap();
        assert!(config.servers["echo"].args.is_empty());
        assert!(config.servers["echo"].env.is_empty());
    }

    #[test]
    fn new_server_config_has_no_env() {
        let config = McpServerConfig::new("cat", vec![]);
        assert!(config.env.is_empty());
        assert_eq!(config.timeout_ms, 30000);
    }
}
