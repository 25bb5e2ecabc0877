//! MCP tool invocation over stdio.
//!
//! Every call starts the named server as a subprocess, negotiates a session,
//! checks the tool exists, calls it and tears the process down again. Errors
//! never escape: they are folded into a [`ToolCallResult`] so the agent loop
//! can show them to the model and move on.

mod protocol;
mod retry;
mod session;


pub use protocol::ToolInfo;
pub use retry::RetryPolicy;
use session::StdioServer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::config::{Config, ServerConfig};
use crate::error::ToolInvocationError;

/// Normalized outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub success: bool,
    pub text: Option<String>,
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn ok(text: Option<String>) -> Self {
        Self {
            success: true,
            text,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<Option<String>, ToolInvocationError>> for ToolCallResult {
    fn from(result: Result<Option<String>, ToolInvocationError>) -> Self {
        match result {
            Ok(text) => Self::ok(text),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// A tool call after the retry policy is done with it.
#[derive(Debug, Clone)]
pub struct RetriedCall {
    pub result: ToolCallResult,
    pub attempts: usize,
}

/// Anything that can execute `server.tool(args)`.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// One attempt. Never fails; failures are reported in the result.
    async fn invoke(&self, server: &str, tool: &str, args: &Map<String, Value>) -> ToolCallResult;

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
    }

    /// Sanitizes `args` and runs [`invoke`](Self::invoke) under the retry
    /// policy.
    async fn invoke_with_retry(
        &self,
        server: &str,
        tool: &str,
        args: &Map<String, Value>,
    ) -> RetriedCall {
        let args = sanitize_args(args);
        let args = &args;
        let label = format!("{server}.{tool}");
        let (result, attempts) = self
            .retry_policy()
            .run(&label, move |_| self.invoke(server, tool, args))
            .await;
        RetriedCall { result, attempts }
    }
}

/// Drops null-valued arguments. Servers validate against JSON Schema and
/// reject `null` for optional fields that should simply be absent.
pub fn sanitize_args(args: &Map<String, Value>) -> Map<String, Value> {
    args.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Launches configured MCP servers on demand.
pub struct McpClient {
    servers: BTreeMap<String, ServerConfig>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl McpClient {
    pub fn new(config: &Config) -> Self {
        Self {
            servers: config.servers.clone(),
            timeout: Duration::from_secs(config.agent.tool_timeout_secs()),
            retry: RetryPolicy::from_config(&config.agent),
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn server(&self, name: &str) -> Result<&ServerConfig, ToolInvocationError> {
        self.servers
            .get(name)
            .ok_or_else(|| ToolInvocationError::UnknownServer {
                server: name.to_string(),
                configured: self.servers.keys().cloned().collect(),
            })
    }

    /// Starts `server` and returns its tool catalog.
    pub async fn list_tools(&self, server: &str) -> Result<Vec<ToolInfo>, ToolInvocationError> {
        let mut process = StdioServer::launch(server, self.server(server)?, self.timeout)?;
        let result = async {
            process.session().initialize().await?;
            process.session().list_tools().await
        }
        .await;
        process.shutdown().await;
        result
    }

    async fn call(
        &self,
        server: &str,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<Option<String>, ToolInvocationError> {
        let mut process = StdioServer::launch(server, self.server(server)?, self.timeout)?;
        let result = process.session().run_tool_call(server, tool, args).await;
        process.shutdown().await;
        result
    }
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn invoke(&self, server: &str, tool: &str, args: &Map<String, Value>) -> ToolCallResult {
        let args = sanitize_args(args);
        let started = Instant::now();
        let shown = Value::Object(args.clone());
        tracing::info!(server, tool, args = %shown, "calling tool");

        let result = ToolCallResult::from(self.call(server, tool, &args).await);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result.error {
            None => tracing::info!(
                server,
                tool,
                elapsed_ms,
                len = result.text.as_deref().map_or(0, str::len),
                "tool call succeeded"
            ),
            Some(error) => tracing::warn!(server, tool, elapsed_ms, %error, "tool call failed"),
        }
        result
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}
