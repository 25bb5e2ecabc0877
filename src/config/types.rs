//! Struct definitions and serde defaults for ferret configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{
    DEFAULT_BACKEND, DEFAULT_BACKEND_TIMEOUT_SECS, DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_STEPS,
    DEFAULT_MAX_TOOL_RETRIES, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_TOOL_TIMEOUT_SECS,
};

/// Root configuration for ferret, deserialized from `config.toml` / `ferret.toml`.
///
/// Built once at startup and handed by reference to the agent, the MCP client
/// and the backend dispatcher. Nothing downstream reads the environment.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Backend name (`ollama`, `groq`, `openai`, `anthropic`).
    #[serde(default)]
    pub backend: Option<String>,
    /// Per-backend connection settings.
    #[serde(default)]
    pub backends: BackendsConfig,
    /// Logical MCP server name -> launch settings.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
    /// Planning loop tuning.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Backend-specific configuration map. Only configured backends are `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BackendsConfig {
    pub ollama: Option<BackendEntry>,
    pub groq: Option<BackendEntry>,
    pub openai: Option<BackendEntry>,
    pub anthropic: Option<BackendEntry>,
}

/// Connection details for a single backend.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BackendEntry {
    /// API key for authentication.
    pub api_key: Option<String>,
    /// Base URL of the backend's API.
    pub base_url: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
}

/// How to launch one MCP server over stdio.
///
/// `command` may hold a whole command line (`"uvx mcp-server-fetch"`) when
/// `args` is empty; it is split shell-style at launch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Tool documentation shown to the planner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ServerConfig {
    pub fn from_command_line(line: impl Into<String>) -> Self {
        Self {
            command: line.into(),
            args: Vec::new(),
            description: None,
        }
    }
}

/// Tuning knobs for the planning loop. Unset fields fall back to constants.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AgentConfig {
    pub max_steps: Option<usize>,
    pub max_tool_retries: Option<usize>,
    pub retry_backoff_ms: Option<u64>,
    pub tool_timeout_secs: Option<u64>,
    pub backend_timeout_secs: Option<u64>,
    pub history_window: Option<usize>,
    /// Reject tool calls that break the fetch → write → metadata order.
    pub strict_workflow: Option<bool>,
}

impl AgentConfig {
    pub fn max_steps(&self) -> usize {
        self.max_steps.unwrap_or(DEFAULT_MAX_STEPS)
    }

    /// Attempts per tool call, never below one.
    pub fn max_tool_retries(&self) -> usize {
        self.max_tool_retries
            .unwrap_or(DEFAULT_MAX_TOOL_RETRIES)
            .max(1)
    }

    pub fn retry_backoff_ms(&self) -> u64 {
        self.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS)
    }

    pub fn tool_timeout_secs(&self) -> u64 {
        self.tool_timeout_secs.unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS)
    }

    pub fn backend_timeout_secs(&self) -> u64 {
        self.backend_timeout_secs
            .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS)
    }

    /// Steps shown to the planner, clamped to `1..=DEFAULT_HISTORY_WINDOW`.
    pub fn history_window(&self) -> usize {
        self.history_window
            .unwrap_or(DEFAULT_HISTORY_WINDOW)
            .clamp(1, DEFAULT_HISTORY_WINDOW)
    }

    pub fn strict_workflow(&self) -> bool {
        self.strict_workflow.unwrap_or(false)
    }
}

/// Returns the backend name, defaulting to Ollama.
pub(super) fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}

/// The three servers the research workflow expects.
pub(crate) fn default_servers() -> BTreeMap<String, ServerConfig> {
    let mut servers = BTreeMap::new();
    servers.insert(
        "fetch".to_string(),
        ServerConfig::from_command_line("uvx mcp-server-fetch"),
    );
    servers.insert(
        "filesystem".to_string(),
        ServerConfig::from_command_line("npx -y @modelcontextprotocol/server-filesystem ./kb"),
    );
    servers.insert(
        "kb_metadata".to_string(),
        ServerConfig::from_command_line("python -m src.kb_metadata_server.server"),
    );
    servers
}

/// Tool documentation for the well-known servers, used when a server entry
/// has no `description` of its own.
pub(crate) fn builtin_description(server: &str) -> Option<&'static str> {
    match server {
        "fetch" => Some(
            "Tool \"fetch\": fetch a URL and return its content as markdown.\n\
             Args: \"url\" (string, required), \"max_length\" (integer, optional), \
             \"start_index\" (integer, optional), \"raw\" (boolean, optional).",
        ),
        "filesystem" => Some(
            "Tool \"write_file\": write a markdown note under the knowledge base root.\n\
             Args: \"path\" (string, required, relative like \"notes/topic.md\"), \
             \"content\" (string, required).",
        ),
        "kb_metadata" => Some(
            "Tool \"add_metadata\": register metadata for an existing note.\n\
             Args: \"topic\" (string, required), \"file_path\" (string, required, same path \
             as write_file), \"summary\" (string, required, 2-3 sentences).",
        ),
        _ => None,
    }
}
