//! MCP tool session: one provider process, one [`McpTransport`].
//!
//! [`StdioConnector`] spawns the provider and hands back an
//! [`McpToolSession`], which implements the domain's [`ToolSession`]:
//!
//! 1. `initialize` + `notifications/initialized` (handshake)
//! 2. `tools/list`, following `nextCursor` until exhausted
//! 3. `tools/call`, with every failure mapped into a [`ToolResult`]

use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use conductor_domain::{
    ConnectionError, ProviderSpec, RawCapability, ToolError, ToolResult, ToolSession,
    ToolSessionConnector,
};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use super::error::McpError;
use super::protocol::{CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsResult};
use super::transport::McpTransport;

/// Upper bound on `tools/list` pages, against providers that loop cursors
const MAX_LIST_PAGES: usize = 64;

/// If `arg` is exactly `${VAR}`, return `VAR`.
pub fn placeholder_var(arg: &str) -> Option<&str> {
    arg.strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty() && !name.contains(['$', '{', '}']))
}

/// Expand `${VAR}` arguments using `lookup`.
///
/// Unresolved placeholders pass through unchanged.
pub fn expand_args_with<F>(args: &[String], lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    args.iter()
        .map(|arg| match placeholder_var(arg) {
            Some(var) => match lookup(var) {
                Some(value) => value,
                None => {
                    warn!(var, "Environment variable not set; passing placeholder through");
                    arg.clone()
                }
            },
            None => arg.clone(),
        })
        .collect()
}

/// Expand `${VAR}` arguments from the process environment.
pub fn expand_args(args: &[String]) -> Vec<String> {
    expand_args_with(args, |var| std::env::var(var).ok())
}

/// A live connection to one MCP provider.
pub struct McpToolSession {
    provider: String,
    transport: McpTransport,
    child: StdMutex<Option<Child>>,
    request_timeout: Duration,
    call_timeout: Duration,
}

impl McpToolSession {
    /// Spawn the provider described by `spec` and complete the handshake.
    pub async fn spawn(spec: &ProviderSpec) -> Result<Self, ConnectionError> {
        let args = expand_args(&spec.args);
        debug!(provider = %spec.name, command = %spec.command, ?args, "Spawning provider");

        let mut cmd = Command::new(&spec.command);
        cmd.args(&args)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let spawn_error = |message: String| ConnectionError::Spawn {
            provider: spec.name.clone(),
            message,
        };

        let mut child = cmd
            .spawn()
            .map_err(|e| spawn_error(McpError::Spawn(e).to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error("Failed to capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error("Failed to capture stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(spec.name.clone(), stderr);
        }

        let mut session = Self::from_transport(
            McpTransport::start(&spec.name, stdout, stdin),
            spec.request_timeout,
            spec.call_timeout,
        );
        session.child = StdMutex::new(Some(child));

        // On failure the session is dropped here, which kills the child.
        session.initialize().await?;
        Ok(session)
    }

    /// Wrap an already-started transport. The handshake is not performed.
    pub fn from_transport(
        transport: McpTransport,
        request_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider: transport.provider().to_string(),
            transport,
            child: StdMutex::new(None),
            request_timeout,
            call_timeout,
        }
    }

    /// Connect over arbitrary streams and complete the handshake.
    pub async fn connect_streams<R, W>(
        provider: impl Into<String>,
        reader: R,
        writer: W,
        request_timeout: Duration,
        call_timeout: Duration,
    ) -> Result<Self, ConnectionError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + 'static,
    {
        let session = Self::from_transport(
            McpTransport::start(provider, reader, writer),
            request_timeout,
            call_timeout,
        );
        session.initialize().await?;
        Ok(session)
    }

    /// `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&self) -> Result<(), ConnectionError> {
        let handshake_error = |e: McpError| ConnectionError::Handshake {
            provider: self.provider.clone(),
            message: e.to_string(),
        };

        let params = serde_json::to_value(InitializeParams::default())
            .map_err(|e| handshake_error(e.into()))?;
        let result = self
            .transport
            .request("initialize", Some(params), self.request_timeout)
            .await
            .map_err(handshake_error)?;

        let init: InitializeResult = serde_json::from_value(result).unwrap_or_default();
        match &init.server_info {
            Some(server) => info!(
                provider = %self.provider,
                server = %server.name,
                version = %server.version,
                protocol = init.protocol_version.as_deref().unwrap_or("unknown"),
                "Provider initialized"
            ),
            None => info!(provider = %self.provider, "Provider initialized"),
        }

        self.transport
            .notify("notifications/initialized", None)
            .await
            .map_err(handshake_error)
    }

    fn failure(&self, tool_name: &str, error: ToolError, started: Instant) -> ToolResult {
        ToolResult::failure(tool_name, error)
            .with_provider(&self.provider)
            .with_duration(started.elapsed().as_millis() as u64)
    }

    fn take_child(&self) -> Option<Child> {
        self.child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[async_trait]
impl ToolSession for McpToolSession {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn list_capabilities(&self) -> Result<Vec<RawCapability>, ConnectionError> {
        if self.transport.is_closed() {
            return Err(ConnectionError::Closed(self.provider.clone()));
        }

        let discovery_error = |message: String| ConnectionError::Discovery {
            provider: self.provider.clone(),
            message,
        };

        let mut capabilities = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_LIST_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self
                .transport
                .request("tools/list", params, self.request_timeout)
                .await
                .map_err(|e| discovery_error(e.to_string()))?;
            let listing: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| discovery_error(format!("malformed tools/list result: {}", e)))?;

            debug!(
                provider = %self.provider,
                page,
                count = listing.tools.len(),
                "Listed tools"
            );
            cursor = listing.next_page().map(str::to_string);
            capabilities.extend(listing.tools);

            if cursor.is_none() {
                return Ok(capabilities);
            }
        }

        warn!(
            provider = %self.provider,
            pages = MAX_LIST_PAGES,
            "tools/list pagination did not terminate; using what was listed"
        );
        Ok(capabilities)
    }

    async fn invoke(&self, tool_name: &str, arguments: Value) -> ToolResult {
        let started = Instant::now();

        if self.transport.is_closed() {
            return self.failure(tool_name, ToolError::transport_closed(&self.provider), started);
        }

        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };
        let params = match serde_json::to_value(CallToolParams {
            name: tool_name,
            arguments,
        }) {
            Ok(params) => params,
            Err(e) => {
                return self.failure(tool_name, ToolError::invalid_argument(e.to_string()), started);
            }
        };

        debug!(provider = %self.provider, tool = tool_name, "Calling tool");
        let response = self
            .transport
            .request("tools/call", Some(params), self.call_timeout)
            .await;

        let value = match response {
            Ok(value) => value,
            Err(McpError::Rpc { code, message }) => {
                return self.failure(
                    tool_name,
                    ToolError::execution_failed(message).with_details(format!("code {}", code)),
                    started,
                );
            }
            Err(McpError::Timeout(_)) => {
                return self.failure(
                    tool_name,
                    ToolError::timeout(format!(
                        "{}.{} after {}s",
                        self.provider,
                        tool_name,
                        self.call_timeout.as_secs_f64()
                    )),
                    started,
                );
            }
            Err(McpError::TransportClosed) => {
                return self.failure(
                    tool_name,
                    ToolError::transport_closed(&self.provider),
                    started,
                );
            }
            Err(e) => {
                return self.failure(tool_name, ToolError::execution_failed(e.to_string()), started);
            }
        };

        let call: CallToolResult = match serde_json::from_value(value) {
            Ok(call) => call,
            Err(e) => {
                return self.failure(
                    tool_name,
                    ToolError::execution_failed(format!("malformed tools/call result: {}", e)),
                    started,
                );
            }
        };

        let text = call.text();
        if call.is_error {
            return self.failure(tool_name, ToolError::execution_failed(text), started);
        }

        trace!(provider = %self.provider, tool = tool_name, bytes = text.len(), "Tool output");
        ToolResult::success(tool_name, text)
            .with_provider(&self.provider)
            .with_duration(started.elapsed().as_millis() as u64)
    }

    async fn close(&self) {
        let was_open = !self.transport.is_closed();
        self.transport.close();

        if let Some(mut child) = self.take_child() {
            if let Err(e) = child.kill().await {
                debug!(provider = %self.provider, error = %e, "Provider already exited");
            }
        }

        if was_open {
            info!(provider = %self.provider, "Provider session closed");
        }
    }
}

impl Drop for McpToolSession {
    fn drop(&mut self) {
        if let Some(mut child) = self.take_child() {
            debug!(provider = %self.provider, "Session dropping, killing provider process");
            let _ = child.start_kill();
        }
    }
}

/// Forward provider stderr lines into the debug log.
fn forward_stderr<R>(provider: String, stderr: R)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(provider = %provider, "stderr: {}", line);
        }
    });
}

/// Connects providers by spawning them as child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioConnector;

#[async_trait]
impl ToolSessionConnector for StdioConnector {
    async fn connect(&self, spec: &ProviderSpec) -> Result<Arc<dyn ToolSession>, ConnectionError> {
        let session = McpToolSession::spawn(spec).await?;
        Ok(Arc::new(session))
    }
}
