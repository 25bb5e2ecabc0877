//! Error taxonomy for ferret.
//!
//! Only [`ConfigError`] is allowed to stop a run before it starts. Backend
//! failures degrade into plan text inside the agent loop, and tool failures
//! never leave the MCP client; they are folded into a
//! [`ToolCallResult`](crate::mcp::ToolCallResult).

use std::time::Duration;
use thiserror::Error;

/// Missing or invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{backend} backend selected but {setting} is not set")]
    MissingSetting {
        backend: &'static str,
        setting: &'static str,
    },

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Unknown backend: {0}. Supported: ollama, groq, openai, anthropic")]
    UnknownBackend(String),
}

/// Failure talking to an LLM backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("{backend} returned a malformed payload: {detail}")]
    Payload {
        backend: &'static str,
        detail: String,
    },

    #[error("{backend} request failed: {detail}")]
    Transport {
        backend: &'static str,
        detail: String,
    },

    #[error("{backend} request timed out after {}s", .elapsed.as_secs())]
    Timeout {
        backend: &'static str,
        elapsed: Duration,
    },
}

/// Failure somewhere inside one tool invocation.
///
/// Rendered into `ToolCallResult::error`; never returned past the MCP client.
#[derive(Debug, Error)]
pub enum ToolInvocationError {
    #[error("unknown MCP server '{server}' (configured: {})", .configured.join(", "))]
    UnknownServer {
        server: String,
        configured: Vec<String>,
    },

    #[error("empty command for MCP server '{0}'")]
    EmptyCommand(String),

    #[error("failed to start MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tool '{tool}' not found on server '{server}', available: [{}]", .available.join(", "))]
    ToolNotFound {
        server: String,
        tool: String,
        available: Vec<String>,
    },

    #[error("MCP transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("tool reported an error: {0}")]
    ToolFailed(String),

    #[error("timed out after {after:?} during {phase}")]
    Timeout { phase: &'static str, after: Duration },
}

/// A plan that decoded as JSON but cannot be executed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlanShapeError {
    #[error("Unknown action from model: {}", pretty(.0))]
    UnknownAction(serde_json::Value),

    #[error("Invalid tool call plan: {}", pretty(.0))]
    InvalidToolCall(serde_json::Value),
}

pub(crate) fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Truncates an upstream body so error messages stay readable.
pub(crate) fn truncate_body(body: &str) -> String {
    let max = crate::constants::ERROR_BODY_MAX_CHARS;
    if body.chars().count() <= max {
        return body.to_string();
    }
    let cut: String = body.chars().take(max).collect();
    format!("{cut}...")
}
