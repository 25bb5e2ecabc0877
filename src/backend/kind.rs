//! Backend kind enumeration and default model mapping.

use crate::error::ConfigError;

/// Identifies which LLM backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Ollama (local models via the native `/api/chat` endpoint).
    Ollama,
    /// GroqCloud (OpenAI-compatible chat completions).
    Groq,
    /// OpenAI, through rig-core.
    OpenAI,
    /// Anthropic, through rig-core.
    Anthropic,
}

impl BackendKind {
    /// Parses a backend name. Matching is case-insensitive.
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    /// Config key and log label for this backend.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::Groq => "groq",
            BackendKind::OpenAI => "openai",
            BackendKind::Anthropic => "anthropic",
        }
    }
}

/// Returns the default model identifier for a backend, if it has one.
///
/// Groq has no default: its model catalog changes too often, so the model
/// must be configured explicitly.
pub fn default_model_for(kind: BackendKind) -> Option<&'static str> {
    match kind {
        BackendKind::Ollama => Some(crate::constants::OLLAMA_DEFAULT_MODEL),
        BackendKind::Groq => None,
        BackendKind::OpenAI => Some(crate::constants::DEFAULT_OPENAI_MODEL),
        BackendKind::Anthropic => Some(crate::constants::DEFAULT_ANTHROPIC_MODEL),
    }
}
