//! JSON-RPC protocol types for MCP stdio communication.
//!
//! Every frame is one JSON object on one line.
//!
//! - **Requests**: client → provider (`initialize`, `tools/list`, `tools/call`)
//! - **Responses**: provider → client (result or error)
//! - **Notifications**: either direction, no `id` (`notifications/initialized`)
//!
//! Providers may also send requests of their own (`roots/list`,
//! `sampling/createMessage`); the bridge answers those with
//! [`METHOD_NOT_FOUND`].

use conductor_domain::RawCapability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// MCP protocol revision spoken by the bridge
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Client name announced during `initialize`
pub const CLIENT_NAME: &str = "mcp-conductor";

/// JSON-RPC "method not found" error code
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }
}

/// Outgoing JSON-RPC notification (no `id`, no response expected)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Split into the result payload or the remote error.
    ///
    /// A response carrying neither is treated as an empty result.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Error reply to a provider-initiated request.
///
/// The id is echoed back verbatim; providers may use string ids.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorOut {
    pub jsonrpc: &'static str,
    pub id: Value,
    pub error: RpcError,
}

impl JsonRpcErrorOut {
    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: RpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", method),
                data: None,
            },
        }
    }
}

/// `initialize` request parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub client_info: ImplementationInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION,
            capabilities: Value::Object(Default::default()),
            client_info: ImplementationInfo {
                name: CLIENT_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// Name and version of either side of the connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// `initialize` result. Only the parts the bridge logs are decoded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub server_info: Option<ImplementationInfo>,
}

/// One page of `tools/list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<RawCapability>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ListToolsResult {
    /// Cursor for the next page, if the provider advertised a non-empty one.
    pub fn next_page(&self) -> Option<&str> {
        self.next_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// `tools/call` request parameters
#[derive(Debug, Clone, Serialize)]
pub struct CallToolParams<'a> {
    pub name: &'a str,
    pub arguments: Value,
}

/// `tools/call` result
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Render the content blocks as one text.
    ///
    /// `text` blocks contribute their text; any other block is rendered as
    /// its JSON. Blocks are joined by newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(render_content_block)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_content_block(block: &Value) -> String {
    let is_text = block.get("type").and_then(Value::as_str) == Some("text");
    match block.get("text").and_then(Value::as_str) {
        Some(text) if is_text => text.to_string(),
        _ => block.to_string(),
    }
}
