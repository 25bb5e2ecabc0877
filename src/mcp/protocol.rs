//! JSON-RPC 2.0 message shapes used by the MCP stdio transport.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::constants::{MCP_CLIENT_NAME, MCP_PROTOCOL_VERSION};
use crate::error::ToolInvocationError;

/// One tool advertised by a server's `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
    #[serde(default, rename = "nextCursor")]
    pub next_cursor: Option<String>,
}

/// Result payload of `tools/call`.
#[derive(Debug, Deserialize)]
pub(super) struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl CallToolResult {
    /// Text fragments joined by newlines. Images, audio and embedded
    /// resources are skipped. `None` when the server sent no text at all.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

pub(super) fn request(id: u64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

pub(super) fn notification(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "method": method })
}

pub(super) fn initialize_params() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": MCP_CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

pub(super) fn call_params(tool: &str, args: &Map<String, Value>) -> Value {
    json!({ "name": tool, "arguments": args })
}

/// What an incoming line turned out to be, relative to the request we are
/// waiting for.
#[derive(Debug)]
pub(super) enum Incoming {
    /// The response to our request: its `result`, or the JSON-RPC error.
    Response(Result<Value, ToolInvocationError>),
    /// A request from the server (e.g. `ping`) that expects an answer.
    ServerRequest { id: Value, method: String },
    /// Notifications, stale responses and anything else we can ignore.
    Ignored,
}

pub(super) fn classify(message: &Value, expected_id: u64) -> Incoming {
    let id = message.get("id");
    if let Some(method) = message.get("method").and_then(Value::as_str) {
        return match id {
            Some(id) if !id.is_null() => Incoming::ServerRequest {
                id: id.clone(),
                method: method.to_string(),
            },
            _ => Incoming::Ignored,
        };
    }
    if id.and_then(Value::as_u64) != Some(expected_id) {
        return Incoming::Ignored;
    }
    if let Some(error) = message.get("error") {
        return Incoming::Response(Err(ToolInvocationError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        }));
    }
    match message.get("result") {
        Some(result) => Incoming::Response(Ok(result.clone())),
        None => Incoming::Response(Err(ToolInvocationError::Protocol(
            "response has neither result nor error".to_string(),
        ))),
    }
}

/// Reply to a server-initiated request. Only `ping` is supported.
pub(super) fn reply_to(id: Value, method: &str) -> Value {
    if method == "ping" {
        json!({ "jsonrpc": "2.0", "id": id, "result": {} })
    } else {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("method not supported: {method}") },
        })
    }
}
