//! Environment variable substitution, environment overrides and
//! server command resolution.

use super::types::{default_backend, BackendEntry, Config, ServerConfig};
use crate::error::{ConfigError, ToolInvocationError};

impl Config {
    /// Resolve `{env:VAR_NAME}` patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        if let Some(ref mut backend) = self.backend {
            *backend = Self::resolve_str(backend);
        }
        Self::resolve_backend_entry(&mut self.backends.ollama);
        Self::resolve_backend_entry(&mut self.backends.groq);
        Self::resolve_backend_entry(&mut self.backends.openai);
        Self::resolve_backend_entry(&mut self.backends.anthropic);
        for server in self.servers.values_mut() {
            server.command = Self::resolve_str(&server.command);
            for arg in server.args.iter_mut() {
                *arg = Self::resolve_str(arg);
            }
        }
    }

    fn resolve_backend_entry(entry: &mut Option<BackendEntry>) {
        if let Some(ref mut e) = entry {
            for field in [&mut e.api_key, &mut e.base_url, &mut e.model] {
                if let Some(value) = field.as_mut() {
                    *value = Self::resolve_str(value);
                }
            }
        }
    }

    /// Replace `{env:VAR}` with the environment variable value. Substituted
    /// text is not scanned again.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(start) = rest.find("{env:") {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            let var_name = &rest[start + 5..start + end];
            result.push_str(&rest[..start]);
            result.push_str(&std::env::var(var_name).unwrap_or_default());
            rest = &rest[start + end + 1..];
        }
        result.push_str(rest);
        result
    }

    /// Apply the process environment on top of file values.
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub(super) fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(backend) = get("LLM_BACKEND") {
            self.backend = Some(backend.to_lowercase());
        }

        let ollama = self.backends.ollama.get_or_insert_with(BackendEntry::default);
        if let Some(url) = get("OLLAMA_BASE_URL") {
            ollama.base_url = Some(url);
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            ollama.model = Some(model);
        }

        let groq_vars = [
            get("GROQ_BASE_URL"),
            get("GROQ_MODEL"),
            get("GROQ_API_KEY"),
        ];
        if groq_vars.iter().any(Option::is_some) {
            let groq = self.backends.groq.get_or_insert_with(BackendEntry::default);
            let [base_url, model, api_key] = groq_vars;
            if base_url.is_some() {
                groq.base_url = base_url;
            }
            if model.is_some() {
                groq.model = model;
            }
            if api_key.is_some() {
                groq.api_key = api_key;
            }
        }

        for (var, server) in [
            ("MCP_FETCH_CMD", "fetch"),
            ("MCP_FILESYSTEM_CMD", "filesystem"),
            ("MCP_KB_METADATA_CMD", "kb_metadata"),
        ] {
            if let Some(line) = get(var) {
                let description = self
                    .servers
                    .get(server)
                    .and_then(|s| s.description.clone());
                self.servers.insert(
                    server.to_string(),
                    ServerConfig {
                        description,
                        ..ServerConfig::from_command_line(line)
                    },
                );
            }
        }

        if let Some(v) = get("MAX_TOOL_RETRIES") {
            self.agent.max_tool_retries = Some(parse_number("MAX_TOOL_RETRIES", &v)?);
        }
        if let Some(v) = get("MAX_STEPS") {
            self.agent.max_steps = Some(parse_number("MAX_STEPS", &v)?);
        }
        Ok(())
    }

    /// The selected backend name, lowercased.
    pub fn backend_name(&self) -> String {
        self.backend
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(default_backend)
    }

    /// Resolve an API key: `<BACKEND>_API_KEY` from the environment first,
    /// then the config value. Empty strings count as unset.
    pub fn resolve_api_key(&self, backend: &str) -> Option<String> {
        let env_key = format!("{}_API_KEY", backend.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }
        self.backend_entry(backend)
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    pub fn backend_entry(&self, backend: &str) -> Option<&BackendEntry> {
        match backend {
            "ollama" => self.backends.ollama.as_ref(),
            "groq" => self.backends.groq.as_ref(),
            "openai" => self.backends.openai.as_ref(),
            "anthropic" => self.backends.anthropic.as_ref(),
            _ => None,
        }
    }
}

impl ServerConfig {
    /// Program and arguments to spawn for this server.
    pub fn launch_spec(&self, name: &str) -> Result<(String, Vec<String>), ToolInvocationError> {
        let mut parts = if self.args.is_empty() {
            split_command_line(&self.command)
        } else {
            let mut parts = vec![self.command.trim().to_string()];
            parts.extend(self.args.iter().cloned());
            parts
        };
        if parts.first().map_or(true, |p| p.is_empty()) {
            return Err(ToolInvocationError::EmptyCommand(name.to_string()));
        }
        let program = parts.remove(0);
        Ok((program, parts))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

/// Split a command line into words, honoring single quotes, double quotes
/// and backslash escapes the way a POSIX shell would for simple commands.
pub fn split_command_line(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('"'), '"') => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(next @ ('"' | '\\' | '$' | '`')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}
