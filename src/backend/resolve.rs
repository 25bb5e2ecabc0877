//! Backend resolution for ferret.
//!
//! Resolves which backend and model to use from CLI flags and the loaded
//! config. Supports `backend/model` shorthand on `--model`.

use super::kind::{default_model_for, BackendKind};
use crate::config::Config;
use crate::error::ConfigError;

/// Resolved backend + model pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSelection {
    pub kind: BackendKind,
    pub model: String,
}

/// Resolve which backend and model to use.
/// Priority: CLI flags > config (which already includes env overrides) > defaults.
///
/// Accepts:
///   --model groq/llama-3.1-8b-instant  (backend/model shorthand, only when --backend is omitted)
///   --backend ollama --model qwen2.5:7b
///   --backend openai  (uses the backend's configured or default model)
///   (nothing)  (uses config, then defaults)
pub fn resolve_backend(
    cli_backend: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<BackendSelection, ConfigError> {
    if cli_backend.is_none() {
        if let Some((kind, model)) = cli_model.and_then(|m| m.split_once('/')) {
            if let Ok(kind) = BackendKind::from_str(kind) {
                return Ok(BackendSelection {
                    kind,
                    model: model.to_string(),
                });
            }
        }
    }

    let kind = match cli_backend {
        Some(name) => BackendKind::from_str(name)?,
        None => BackendKind::from_str(&config.backend_name())?,
    };

    let model = cli_model
        .map(String::from)
        .or_else(|| {
            config
                .backend_entry(kind.name())
                .and_then(|e| e.model.clone())
                .filter(|m| !m.is_empty())
        })
        .or_else(|| default_model_for(kind).map(String::from))
        .ok_or(ConfigError::MissingSetting {
            backend: kind.name(),
            setting: "model",
        })?;

    Ok(BackendSelection { kind, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_selects_backend_and_model() {
        let sel = resolve_backend(None, Some("groq/llama-3.1-8b-instant"), &Config::default())
            .unwrap();
        assert_eq!(sel.kind, BackendKind::Groq);
        assert_eq!(sel.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn slash_in_model_kept_when_backend_is_explicit() {
        let sel = resolve_backend(Some("groq"), Some("meta-llama/llama-4"), &Config::default())
            .unwrap();
        assert_eq!(sel.kind, BackendKind::Groq);
        assert_eq!(sel.model, "meta-llama/llama-4");
    }

    #[test]
    fn falls_back_to_configured_then_default_model() {
        let config = Config::from_toml_str(
            r#"
backend = "ollama"
[backends.ollama]
model = "qwen2.5:7b"
"#,
        )
        .unwrap();
        assert_eq!(resolve_backend(None, None, &config).unwrap().model, "qwen2.5:7b");

        let sel = resolve_backend(Some("openai"), None, &config).unwrap();
        assert_eq!(sel.model, crate::constants::DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn groq_without_model_is_a_config_error() {
        let err = resolve_backend(Some("groq"), None, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting { backend: "groq", setting: "model" }
        ));
    }
}
