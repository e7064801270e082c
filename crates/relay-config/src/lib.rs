//! Layered configuration for Relay.
//!
//! Precedence, highest first: CLI flags, environment variables, the settings
//! file (`<config_dir>/config.toml`), defaults.

use relay_mcp::McpConfig;
use relay_permissions::PermissionRule;
use relay_types::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default OpenAI API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_MODEL: &str = "gpt-4o";

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 25;

pub const DEFAULT_TRACE_DIR: &str = "traces";

/// API key sent to custom endpoints when none is configured.
pub const PLACEHOLDER_API_KEY: &str = "EMPTY";

/// Resolved configuration for a Relay session.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub max_tool_rounds: usize,
    pub show_reasoning: bool,
    pub system_prompt: Option<String>,
    pub trace_dir: PathBuf,
    pub config_dir: PathBuf,
    pub permission_rules: Vec<PermissionRule>,
    pub mcp: McpConfig,
}

/// Settings that can be read from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub permissions: PermissionsSettings,
    #[serde(default)]
    pub trace: TraceSettings,
    /// Tool servers, used when no MCP config file is found.
    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationSettings {
    pub max_tool_rounds: Option<usize>,
    pub show_reasoning: Option<bool>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsSettings {
    #[serde(default)]
    pub rules: Vec<PermissionRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceSettings {
    pub dir: Option<PathBuf>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tool_rounds: Option<usize>,
    /// `--show-reasoning` can only turn display on.
    pub show_reasoning: bool,
    pub trace_dir: Option<PathBuf>,
    /// Explicit MCP server config file (`--config`).
    pub mcp_config: Option<PathBuf>,
}

impl RelayConfig {
    /// Load configuration from all sources, applying precedence rules.
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve(
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let config_dir = env("RELAY_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_config_dir);
        let settings = load_settings_file(&config_dir.join("config.toml"))?;

        let base_url = overrides
            .base_url
            .or_else(|| env("OPENAI_BASE_URL"))
            .or(settings.api.base_url);
        let not_http = |url: &&str| !url.starts_with("http://") && !url.starts_with("https://");
        if let Some(url) = base_url.as_deref().filter(not_http) {
            return Err(ConfigError::InvalidValue {
                key: "base_url".into(),
                message: format!("'{url}' is not an http(s) URL"),
            });
        }

        // A custom endpoint (local OpenAI-compatible server) may run without a key.
        let api_key = match overrides
            .api_key
            .or_else(|| env("OPENAI_API_KEY"))
            .or(settings.api.api_key)
        {
            Some(key) => key,
            None if base_url.is_some() => PLACEHOLDER_API_KEY.to_string(),
            None => {
                return Err(ConfigError::MissingKey {
                    key: "api_key (set OPENAI_API_KEY, pass --api-key, or add [api] api_key to config.toml)"
                        .into(),
                });
            }
        };

        let model = overrides
            .model
            .or_else(|| env("RELAY_MODEL"))
            .or(settings.api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tool_rounds = overrides
            .max_tool_rounds
            .or(settings.conversation.max_tool_rounds)
            .unwrap_or(DEFAULT_MAX_TOOL_ROUNDS);

        let show_reasoning =
            overrides.show_reasoning || settings.conversation.show_reasoning.unwrap_or(false);

        let trace_dir = overrides
            .trace_dir
            .or(settings.trace.dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRACE_DIR));

        let mcp = resolve_mcp_config(overrides.mcp_config.as_deref(), &config_dir, settings.mcp);

        Ok(RelayConfig {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            model,
            max_tokens: settings.api.max_tokens,
            max_tool_rounds,
            show_reasoning,
            system_prompt: settings.conversation.system_prompt,
            trace_dir,
            config_dir,
            permission_rules: settings.permissions.rules,
            mcp,
        })
    }
}

/// The Relay config directory (`~/.relay/`).
pub fn default_config_dir() -> PathBuf {
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relay")
}

/// Read `config.toml`. A missing file means defaults; a malformed one is an error.
fn load_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
        Err(e) => {
            tracing::debug!("No settings file at {}: {e}", path.display());
            Ok(SettingsFile::default())
        }
    }
}

/// Pick the tool-server config: explicit file, then `<config_dir>/mcp.json`,
/// then the `[mcp]` section of the settings file.
///
/// A file that cannot be read or parsed is a warning and yields no servers.
pub fn resolve_mcp_config(explicit: Option<&Path>, config_dir: &Path, settings: McpConfig) -> McpConfig {
    if let Some(path) = explicit {
        return read_mcp_file(path);
    }
    let default_path = config_dir.join("mcp.json");
    if default_path.exists() {
        return read_mcp_file(&default_path);
    }
    settings
}

/// Parse an MCP config file: TOML for `.toml`, JSON (`{"mcpServers": {...}}`) otherwise.
pub fn read_mcp_file(path: &Path) -> McpConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Could not read MCP config {}: {e}", path.display());
            return McpConfig::default();
        }
    };
    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let parsed: Result<McpConfig, String> = if is_toml {
        toml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.unwrap_or_else(|e| {
        tracing::warn!("Could not parse MCP config {}: {e}", path.display());
        McpConfig::default()
    })
}
