//! One MCP conversation over a pair of byte streams.
//!
//! [`McpSession`] is generic over the transport so the same code drives a
//! child process's stdio and the in-memory duplex used in tests. Messages are
//! newline-delimited JSON; every request waits for the response carrying its
//! id, skipping notifications along the way.

use serde_json::{Map, Value};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::protocol::{self, CallToolResult, Incoming, ListToolsResult, ToolInfo};
use crate::config::ServerConfig;
use crate::error::ToolInvocationError;

/// How long a server gets to exit on its own after stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

pub struct McpSession<R, W> {
    reader: R,
    writer: W,
    next_id: u64,
    timeout: Duration,
}

impl<R, W> McpSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, timeout: Duration) -> Self {
        Self {
            reader,
            writer,
            next_id: 1,
            timeout,
        }
    }

    /// Performs the `initialize` handshake and announces readiness.
    pub async fn initialize(&mut self) -> Result<(), ToolInvocationError> {
        let result = self
            .request("initialize", protocol::initialize_params(), "initialize")
            .await?;
        tracing::debug!(
            server = ?result.get("serverInfo"),
            version = ?result.get("protocolVersion"),
            "mcp session initialized"
        );
        self.send(&protocol::notification("notifications/initialized"))
            .await
    }

    /// Fetches the full tool catalog, following pagination cursors.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, ToolInvocationError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => serde_json::json!({ "cursor": c }),
                None => serde_json::json!({}),
            };
            let result = self.request("tools/list", params, "tools/list").await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| ToolInvocationError::Protocol(format!("bad tools/list result: {e}")))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Calls one tool. A result flagged `isError` becomes
    /// [`ToolInvocationError::ToolFailed`] carrying the server's text.
    pub async fn call_tool(
        &mut self,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<Option<String>, ToolInvocationError> {
        let result = self
            .request("tools/call", protocol::call_params(tool, args), "tools/call")
            .await?;
        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| ToolInvocationError::Protocol(format!("bad tools/call result: {e}")))?;
        if result.is_error {
            let detail = result
                .text()
                .unwrap_or_else(|| "(no error text)".to_string());
            return Err(ToolInvocationError::ToolFailed(detail));
        }
        Ok(result.text())
    }

    /// Full per-call flow: handshake, catalog check, call.
    pub async fn run_tool_call(
        &mut self,
        server: &str,
        tool: &str,
        args: &Map<String, Value>,
    ) -> Result<Option<String>, ToolInvocationError> {
        self.initialize().await?;
        let tools = self.list_tools().await?;
        if !tools.iter().any(|t| t.name == tool) {
            return Err(ToolInvocationError::ToolNotFound {
                server: server.to_string(),
                tool: tool.to_string(),
                available: tools.into_iter().map(|t| t.name).collect(),
            });
        }
        self.call_tool(tool, args).await
    }

    async fn request(
        &mut self,
        method: &str,
        params: Value,
        phase: &'static str,
    ) -> Result<Value, ToolInvocationError> {
        let id = self.next_id;
        self.next_id += 1;
        let timeout = self.timeout;

        let exchange = async {
            self.send(&protocol::request(id, method, params)).await?;
            self.read_response(id).await
        };
        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ToolInvocationError::Timeout {
                phase,
                after: timeout,
            }),
        }
    }

    async fn read_response(&mut self, id: u64) -> Result<Value, ToolInvocationError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(ToolInvocationError::Protocol(
                    "server closed the connection".to_string(),
                ));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let message: Value = match serde_json::from_str(trimmed) {
                Ok(v) => v,
                Err(_) => {
                    tracing::debug!(line = trimmed, "skipping non-JSON line from server");
                    continue;
                }
            };
            match protocol::classify(&message, id) {
                Incoming::Response(result) => return result,
                Incoming::ServerRequest { id: req_id, method } => {
                    tracing::debug!(%method, "answering server request");
                    self.send(&protocol::reply_to(req_id, &method)).await?;
                }
                Incoming::Ignored => {
                    tracing::trace!(message = %trimmed, "skipping message");
                }
            }
        }
    }

    async fn send(&mut self, message: &Value) -> Result<(), ToolInvocationError> {
        let mut bytes = serde_json::to_vec(message)
            .map_err(|e| ToolInvocationError::Protocol(e.to_string()))?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// A launched MCP server subprocess plus its session.
///
/// Lives for one tool call or one catalog listing. [`StdioServer::shutdown`]
/// closes stdin and reaps the child; if the value is dropped instead, the
/// child is killed via `kill_on_drop`.
pub struct StdioServer {
    name: String,
    child: Child,
    session: McpSession<BufReader<ChildStdout>, ChildStdin>,
}

impl StdioServer {
    pub fn launch(
        name: &str,
        config: &ServerConfig,
        timeout: Duration,
    ) -> Result<Self, ToolInvocationError> {
        let (program, args) = config.launch_spec(name)?;
        tracing::debug!(server = name, %program, ?args, "launching MCP server");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolInvocationError::Spawn {
                server: name.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolInvocationError::Protocol("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolInvocationError::Protocol("child stdout unavailable".to_string()))?;

        Ok(Self {
            name: name.to_string(),
            child,
            session: McpSession::new(BufReader::new(stdout), stdin, timeout),
        })
    }

    pub fn session(&mut self) -> &mut McpSession<BufReader<ChildStdout>, ChildStdin> {
        &mut self.session
    }

    /// Closes stdin, gives the server a moment to exit, then kills it.
    pub async fn shutdown(self) {
        let Self {
            name,
            mut child,
            session,
        } = self;
        drop(session);

        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(server = %name, %status, "MCP server exited"),
            Ok(Err(e)) => tracing::debug!(server = %name, error = %e, "waiting on MCP server failed"),
            Err(_) => {
                tracing::debug!(server = %name, "MCP server did not exit, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(server = %name, error = %e, "failed to kill MCP server");
                }
            }
        }
    }
}
