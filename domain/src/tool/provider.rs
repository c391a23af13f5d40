//! Tool provider abstraction
//!
//! A *provider* is an external process exposing remote capabilities. This
//! module defines how the rest of the system talks to one:
//!
//! ```text
//!   ProviderSpec ──connect──▶ ToolSession ──list_capabilities──▶ RawCapability*
//!                                  │
//!                                  └──invoke(name, args)──▶ ToolResult
//! ```
//!
//! [`ToolSessionConnector`] turns a [`ProviderSpec`] into a live
//! [`ToolSession`]. The registry only ever sees these two traits, so tests can
//! swap in in-memory sessions.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value_objects::ToolResult;

/// Default timeout for handshake and listing requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a single invocation
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while establishing a provider connection.
///
/// Invocation failures are not errors; see [`ToolResult::failure`].
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The provider process could not be started
    #[error("Failed to spawn provider '{provider}': {message}")]
    Spawn { provider: String, message: String },

    /// The protocol handshake was rejected or timed out
    #[error("Handshake with provider '{provider}' failed: {message}")]
    Handshake { provider: String, message: String },

    /// Capability discovery failed
    #[error("Discovery on provider '{provider}' failed: {message}")]
    Discovery { provider: String, message: String },

    /// The connection is already closed
    #[error("Provider '{0}' is closed")]
    Closed(String),
}

impl ConnectionError {
    pub fn provider(&self) -> &str {
        match self {
            ConnectionError::Spawn { provider, .. }
            | ConnectionError::Handshake { provider, .. }
            | ConnectionError::Discovery { provider, .. } => provider,
            ConnectionError::Closed(provider) => provider,
        }
    }
}

/// How to launch one provider process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSpec {
    /// Provider name, unique in the configuration
    pub name: String,
    /// Executable to launch
    pub command: String,
    /// Arguments; `${VAR}` entries are expanded at connect time
    pub args: Vec<String>,
    /// Extra environment variables for the child
    pub env: BTreeMap<String, String>,
    /// Optional human description
    pub description: Option<String>,
    /// Timeout for handshake and listing
    pub request_timeout: Duration,
    /// Timeout for a single invocation
    pub call_timeout: Duration,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            description: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A capability exactly as the provider advertised it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCapability {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: serde_json::Value,
}

impl RawCapability {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// One live connection to one provider.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Name of the provider this session talks to
    fn provider(&self) -> &str;

    /// Ask the provider for its capabilities.
    async fn list_capabilities(&self) -> Result<Vec<RawCapability>, ConnectionError>;

    /// Invoke a capability by name.
    ///
    /// Never fails: errors are carried inside the returned [`ToolResult`].
    async fn invoke(&self, tool_name: &str, arguments: serde_json::Value) -> ToolResult;

    /// Shut the connection down. Calling it twice is harmless.
    async fn close(&self);
}

/// Factory for [`ToolSession`]s.
#[async_trait]
pub trait ToolSessionConnector: Send + Sync {
    async fn connect(&self, spec: &ProviderSpec) -> Result<Arc<dyn ToolSession>, ConnectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::value_objects::ToolError;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockSession {
        provider: String,
        capabilities: Vec<RawCapability>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl ToolSession for MockSession {
        fn provider(&self) -> &str {
            &self.provider
        }

        async fn list_capabilities(&self) -> Result<Vec<RawCapability>, ConnectionError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ConnectionError::Closed(self.provider.clone()));
            }
            Ok(self.capabilities.clone())
        }

        async fn invoke(&self, tool_name: &str, _arguments: serde_json::Value) -> ToolResult {
            if self.closed.load(Ordering::SeqCst) {
                return ToolResult::failure(tool_name, ToolError::transport_closed(&self.provider));
            }
            if self.capabilities.iter().any(|c| c.name == tool_name) {
                ToolResult::success(tool_name, "Mock output")
            } else {
                ToolResult::failure(tool_name, ToolError::not_found(tool_name))
            }
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn session() -> MockSession {
        MockSession {
            provider: "mock".to_string(),
            capabilities: vec![RawCapability::new(
                "echo",
                "Echo input",
                serde_json::json!({"type": "object"}),
            )],
            closed: AtomicBool::new(false),
        }
    }

    #[tokio::test]
    async fn test_session_invoke_and_close() {
        let session = session();

        assert_eq!(session.list_capabilities().await.unwrap().len(), 1);
        assert!(session.invoke("echo", serde_json::json!({})).await.is_success());

        let missing = session.invoke("nope", serde_json::json!({})).await;
        assert_eq!(missing.error().unwrap().code, ToolError::NOT_FOUND);

        session.close().await;
        session.close().await;
        let closed = session.invoke("echo", serde_json::json!({})).await;
        assert_eq!(closed.error().unwrap().code, ToolError::TRANSPORT_CLOSED);
        assert!(matches!(
            session.list_capabilities().await,
            Err(ConnectionError::Closed(_))
        ));
    }

    #[test]
    fn test_raw_capability_deserializes_wire_shape() {
        let cap: RawCapability = serde_json::from_value(serde_json::json!({
            "name": "list_dir",
            "description": "List a directory",
            "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}}
        }))
        .unwrap();

        assert_eq!(cap.name, "list_dir");
        assert_eq!(cap.input_schema["properties"]["path"]["type"], "string");

        let bare: RawCapability = serde_json::from_value(serde_json::json!({"name": "ping"})).unwrap();
        assert!(bare.description.is_empty());
        assert!(bare.input_schema.is_null());
    }

    #[test]
    fn test_provider_spec_builder() {
        let spec = ProviderSpec::new("filesystem", "npx")
            .with_args(["-y", "server-filesystem"])
            .with_env("NODE_ENV", "production")
            .with_call_timeout(Duration::from_secs(5));

        assert_eq!(spec.args, vec!["-y", "server-filesystem"]);
        assert_eq!(spec.env.get("NODE_ENV").map(String::as_str), Some("production"));
        assert_eq!(spec.call_timeout, Duration::from_secs(5));
        assert_eq!(spec.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_connection_error_provider() {
        let err = ConnectionError::Handshake {
            provider: "fs".into(),
            message: "timeout".into(),
        };
        assert_eq!(err.provider(), "fs");
        assert_eq!(err.to_string(), "Handshake with provider 'fs' failed: timeout");
    }
}
