//! Configuration types and loading for ferret.
//!
//! Settings come from TOML (`~/.config/ferret/config.toml`, overridden by a
//! project-level `ferret.toml`), then `{env:VAR}` placeholders are expanded
//! and the legacy environment variables (`LLM_BACKEND`, `GROQ_API_KEY`,
//! `MCP_FETCH_CMD`, ...) are applied on top. The result is a single
//! [`Config`] value passed explicitly to everything that needs it.

mod loader;
mod paths;
mod resolve;
mod types;

pub(crate) use types::builtin_description;
pub use types::{AgentConfig, Config, ServerConfig};

use anyhow::Result;

impl Config {
    /// Load config with precedence: environment > project > global > defaults.
    /// Creates the global config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }
        if config.servers.is_empty() {
            config.servers = types::default_servers();
        }

        config.resolve_substitutions();
        config.apply_env_overrides()?;
        Ok(config)
    }
}
