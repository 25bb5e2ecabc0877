//! File loading and merging for ferret configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{AgentConfig, BackendsConfig, Config};

/// Written to the global config path on first use.
const DEFAULT_CONFIG_TOML: &str = r#"backend = "ollama"

[backends.ollama]
base_url = "http://localhost:11434"
model = "llama3.2:3b"

[backends.groq]
base_url = "https://api.groq.com/openai/v1"
api_key = "{env:GROQ_API_KEY}"

[servers.fetch]
command = "uvx mcp-server-fetch"

[servers.filesystem]
command = "npx -y @modelcontextprotocol/server-filesystem ./kb"

[servers.kb_metadata]
command = "python -m src.kb_metadata_server.server"

[agent]
max_steps = 5
max_tool_retries = 2
"#;

impl Config {
    /// Loads the global config from `~/.config/ferret/config.toml`,
    /// creating it with defaults when missing.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, DEFAULT_CONFIG_TOML)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            tracing::info!(path = %path.display(), "wrote default config");
            return Self::from_toml_str(DEFAULT_CONFIG_TOML)
                .context("Failed to parse default config");
        }
        Self::load_file(&path)
    }

    /// Look for `ferret.toml` in the current dir, then walk up to the git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(crate::constants::PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                return Self::load_file(&candidate).map(Some);
            }
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub(super) fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config at {:?}", path))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge project config over global config. Project values win when present;
    /// server tables are unioned with project entries replacing global ones.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut servers = global.servers;
        servers.extend(project.servers);

        Config {
            backend: project.backend.or(global.backend),
            backends: BackendsConfig {
                ollama: project.backends.ollama.or(global.backends.ollama),
                groq: project.backends.groq.or(global.backends.groq),
                openai: project.backends.openai.or(global.backends.openai),
                anthropic: project.backends.anthropic.or(global.backends.anthropic),
            },
            servers,
            agent: AgentConfig {
                max_steps: project.agent.max_steps.or(global.agent.max_steps),
                max_tool_retries: project
                    .agent
                    .max_tool_retries
                    .or(global.agent.max_tool_retries),
                retry_backoff_ms: project
                    .agent
                    .retry_backoff_ms
                    .or(global.agent.retry_backoff_ms),
                tool_timeout_secs: project
                    .agent
                    .tool_timeout_secs
                    .or(global.agent.tool_timeout_secs),
                backend_timeout_secs: project
                    .agent
                    .backend_timeout_secs
                    .or(global.agent.backend_timeout_secs),
                history_window: project.agent.history_window.or(global.agent.history_window),
                strict_workflow: project
                    .agent
                    .strict_workflow
                    .or(global.agent.strict_workflow),
            },
        }
    }
}
