//! Backend client with enum dispatch.
//!
//! [`Backend`] owns one concrete client and the model name. Ollama and Groq
//! are spoken to directly over HTTP so status codes and error bodies reach
//! the caller intact; OpenAI and Anthropic go through rig-core's provider
//! clients.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{anthropic, openai};
use std::time::{Duration, Instant};

use super::groq::GroqClient;
use super::kind::BackendKind;
use super::ollama::OllamaClient;
use super::resolve::BackendSelection;
use super::ChatBackend;
use crate::config::Config;
use crate::error::{BackendError, ConfigError};
use crate::message::{ChatMessage, Role};

/// Internal enum wrapping backend-specific clients.
enum ClientKind {
    Ollama(OllamaClient),
    Groq(GroqClient),
    OpenAI(openai::Client),
    Anthropic(anthropic::Client),
}

/// A configured LLM backend ready to answer chat requests.
pub struct Backend {
    client: ClientKind,
    kind: BackendKind,
    model: String,
    timeout: Duration,
}

/// Builds a one-shot rig agent with the system text as preamble and yields
/// the future answering the user text. Rig agents are cheap to create per call.
macro_rules! rig_prompt {
    ($client:expr, $model:expr, $system:expr, $user:expr) => {
        async {
            let agent = $client
                .agent($model)
                .preamble($system)
                .max_tokens(crate::constants::MAX_TOKENS)
                .build();
            agent.prompt($user).await
        }
    };
}

impl Backend {
    /// Creates a [`Backend`] for the selected kind and model.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when the backend lacks a
    /// required setting (Groq base URL or API key, OpenAI/Anthropic API key).
    pub fn from_config(config: &Config, selection: &BackendSelection) -> Result<Self, ConfigError> {
        let timeout = Duration::from_secs(config.agent.backend_timeout_secs());
        let entry = config.backend_entry(selection.kind.name());
        let base_url = entry
            .and_then(|e| e.base_url.clone())
            .filter(|u| !u.is_empty());

        let client = match selection.kind {
            BackendKind::Ollama => ClientKind::Ollama(OllamaClient::new(
                base_url.unwrap_or_else(|| crate::constants::OLLAMA_DEFAULT_BASE_URL.to_string()),
                timeout,
            )),
            BackendKind::Groq => {
                let base_url = base_url.ok_or(ConfigError::MissingSetting {
                    backend: "groq",
                    setting: "GROQ_BASE_URL",
                })?;
                let api_key = config
                    .resolve_api_key("groq")
                    .ok_or(ConfigError::MissingSetting {
                        backend: "groq",
                        setting: "GROQ_API_KEY",
                    })?;
                ClientKind::Groq(GroqClient::new(base_url, api_key, timeout))
            }
            BackendKind::OpenAI => {
                let api_key = config
                    .resolve_api_key("openai")
                    .ok_or(ConfigError::MissingSetting {
                        backend: "openai",
                        setting: "OPENAI_API_KEY",
                    })?;
                let client = openai::Client::new(&api_key).map_err(|e| {
                    ConfigError::InvalidValue("backends.openai".to_string(), e.to_string())
                })?;
                ClientKind::OpenAI(client)
            }
            BackendKind::Anthropic => {
                let api_key = config
                    .resolve_api_key("anthropic")
                    .ok_or(ConfigError::MissingSetting {
                        backend: "anthropic",
                        setting: "ANTHROPIC_API_KEY",
                    })?;
                let client = anthropic::Client::new(&api_key).map_err(|e| {
                    ConfigError::InvalidValue("backends.anthropic".to_string(), e.to_string())
                })?;
                ClientKind::Anthropic(client)
            }
        };

        Ok(Self {
            client,
            kind: selection.kind,
            model: selection.model.clone(),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Awaits a rig-core request, bounded by the backend timeout.
    async fn bounded<F, E>(&self, fut: F) -> Result<String, BackendError>
    where
        F: std::future::Future<Output = Result<String, E>>,
        E: std::fmt::Display,
    {
        let backend = self.kind.name();
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(BackendError::Transport {
                backend,
                detail: e.to_string(),
            }),
            Err(_) => Err(BackendError::Timeout {
                backend,
                elapsed: started.elapsed(),
            }),
        }
    }
}

#[async_trait]
impl ChatBackend for Backend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        let started = Instant::now();
        tracing::info!(
            backend = self.kind.name(),
            model = %self.model,
            messages = messages.len(),
            "backend request"
        );
        let result = match &self.client {
            ClientKind::Ollama(client) => client.chat(&self.model, messages).await,
            ClientKind::Groq(client) => client.chat(&self.model, messages).await,
            ClientKind::OpenAI(client) => {
                let (system, user) = split_roles(messages);
                self.bounded(rig_prompt!(client, &self.model, system.as_str(), user.as_str()))
                    .await
            }
            ClientKind::Anthropic(client) => {
                let (system, user) = split_roles(messages);
                self.bounded(rig_prompt!(client, &self.model, system.as_str(), user.as_str()))
                    .await
            }
        };
        match &result {
            Ok(text) => tracing::info!(
                backend = self.kind.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                len = text.len(),
                "backend response"
            ),
            Err(e) => tracing::warn!(backend = self.kind.name(), error = %e, "backend request failed"),
        }
        result
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.kind.name(), self.model)
    }
}

/// Splits messages into the rig preamble (system) and prompt (user) texts.
fn split_roles(messages: &[ChatMessage]) -> (String, String) {
    (join_role(messages, Role::System), join_role(messages, Role::User))
}

/// Concatenates all messages of one role, separated by blank lines.
fn join_role(messages: &[ChatMessage], role: Role) -> String {
    messages
        .iter()
        .filter(|m| m.role == role)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
