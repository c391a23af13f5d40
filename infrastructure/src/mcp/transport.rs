//! Newline-delimited JSON-RPC transport.
//!
//! [`McpTransport`] is the single owner of a provider's output stream:
//!
//! ```text
//!   request() ──write──▶ provider stdin
//!       ▲
//!       └── oneshot ◀── reader task ◀── provider stdout
//! ```
//!
//! - Responses are correlated to pending requests by id.
//! - Provider-initiated requests are answered with "method not found".
//! - Notifications are logged and dropped.
//!
//! When the reader task exits (EOF, I/O error or [`McpTransport::close`]),
//! every pending sender is dropped so waiting callers observe
//! [`McpError::TransportClosed`].

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::error::{McpError, Result};
use super::protocol::{JsonRpcErrorOut, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

type PendingMap = Arc<StdMutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type SharedWriter = Arc<Mutex<BufWriter<Pin<Box<dyn AsyncWrite + Send>>>>>;

/// Classification of an incoming JSON-RPC message.
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A response to a request we sent (has `id`, no `method`).
    Response,
    /// A request from the provider (has `id` + `method`).
    IncomingRequest { id: Value },
    /// A notification (has `method`, no `id`).
    Notification,
    /// Neither `id` nor `method`.
    Invalid,
}

/// Classify a JSON-RPC message by inspecting `id` and `method` fields.
pub fn classify_message(json: &Value) -> MessageKind {
    let id = json.get("id").filter(|v| !v.is_null());
    let method = json.get("method").and_then(Value::as_str);

    match (id, method) {
        (Some(id), Some(_)) => MessageKind::IncomingRequest { id: id.clone() },
        (Some(_), None) => MessageKind::Response,
        (None, Some(_)) => MessageKind::Notification,
        (None, None) => MessageKind::Invalid,
    }
}

/// One JSON-RPC connection to one provider.
pub struct McpTransport {
    provider: String,
    writer: SharedWriter,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl McpTransport {
    /// Start the reader task over `reader` and return the connected transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<R, W>(provider: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + 'static,
    {
        let provider = provider.into();
        let writer: SharedWriter = Arc::new(Mutex::new(BufWriter::new(Box::pin(writer))));
        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        tokio::spawn(reader_loop(
            provider.clone(),
            reader,
            Arc::clone(&writer),
            Arc::clone(&pending),
            Arc::clone(&closed),
            shutdown.clone(),
        ));

        Self {
            provider,
            writer,
            pending,
            closed,
            shutdown,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its response, up to `timeout`.
    ///
    /// Returns the `result` payload; a JSON-RPC error becomes
    /// [`McpError::Rpc`].
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(McpError::TransportClosed);
        }

        let request = JsonRpcRequest::new(method, params);
        let request_id = request.id;
        let (tx, rx) = oneshot::channel();

        self.lock_pending().insert(request_id, tx);

        // The reader marks the transport closed before it drains the map, so
        // an insert that raced the drain is caught here.
        if self.is_closed() {
            self.lock_pending().remove(&request_id);
            return Err(McpError::TransportClosed);
        }

        if let Err(e) = self.write_frame(&request).await {
            self.lock_pending().remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response.into_result().map_err(|e| McpError::Rpc {
                code: e.code,
                message: e.message,
            }),
            Ok(Err(_)) => Err(McpError::TransportClosed),
            Err(_) => {
                self.lock_pending().remove(&request_id);
                warn!(
                    provider = %self.provider,
                    method,
                    timeout_ms = timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(McpError::Timeout(method.to_string()))
            }
        }
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if self.is_closed() {
            return Err(McpError::TransportClosed);
        }
        self.write_frame(&JsonRpcNotification::new(method, params))
            .await
    }

    /// Stop the reader task and fail every pending request. Idempotent.
    pub fn close(&self) {
        self.shutdown.cancel();
        mark_closed(&self.closed, &self.pending);
    }

    async fn write_frame<T: Serialize>(&self, frame: &T) -> Result<()> {
        write_frame(&self.writer, frame).await.map_err(|e| match e {
            McpError::Io(io) if io.kind() == std::io::ErrorKind::BrokenPipe => {
                McpError::TransportClosed
            }
            other => other,
        })
    }

    fn lock_pending(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<JsonRpcResponse>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for McpTransport {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn write_frame<T: Serialize>(writer: &SharedWriter, frame: &T) -> Result<()> {
    let mut line = serde_json::to_string(frame)?;
    trace!("MCP send: {}", line);
    line.push('\n');

    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn mark_closed(closed: &AtomicBool, pending: &PendingMap) {
    closed.store(true, Ordering::SeqCst);
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Background reader loop; single owner of the provider's output.
async fn reader_loop<R>(
    provider: String,
    reader: R,
    writer: SharedWriter,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(provider = %provider, "Provider closed its output");
                break;
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "Reader loop: read failed");
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        trace!("MCP recv: {}", trimmed);

        let json: Value = match serde_json::from_str(trimmed) {
            Ok(json) => json,
            Err(_) => {
                debug!(provider = %provider, "Ignoring non-JSON output: {}", trimmed);
                continue;
            }
        };

        match classify_message(&json) {
            MessageKind::Response => dispatch_response(&provider, json, &pending),
            MessageKind::IncomingRequest { id } => {
                let method = json
                    .get("method")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                debug!(provider = %provider, method, "Rejecting provider request");
                let reply = JsonRpcErrorOut::method_not_found(id, method);
                if let Err(e) = write_frame(&writer, &reply).await {
                    warn!(provider = %provider, error = %e, "Failed to answer provider request");
                }
            }
            MessageKind::Notification => {
                let method = json
                    .get("method")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                debug!(provider = %provider, method, "Provider notification");
            }
            MessageKind::Invalid => {
                debug!(provider = %provider, "Ignoring frame without id or method");
            }
        }
    }

    mark_closed(&closed, &pending);
    debug!(provider = %provider, "Reader loop stopped");
}

fn dispatch_response(provider: &str, json: Value, pending: &PendingMap) {
    let response: JsonRpcResponse = match serde_json::from_value(json) {
        Ok(response) => response,
        Err(e) => {
            warn!(provider, error = %e, "Malformed response frame");
            return;
        }
    };

    let Some(id) = response.id else {
        debug!(provider, "Response without a numeric id");
        return;
    };

    let sender = pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
    match sender {
        Some(tx) => {
            // The caller may have timed out and gone away.
            let _ = tx.send(response);
        }
        None => debug!(provider, id, "Response for unknown or expired request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

    #[test]
    fn classify_response() {
        let json = json!({"jsonrpc": "2.0", "id": 1, "result": {}});
        assert_eq!(classify_message(&json), MessageKind::Response);
    }

    #[test]
    fn classify_incoming_request_with_string_id() {
        let json = json!({"jsonrpc": "2.0", "id": "srv-1", "method": "roots/list"});
        assert_eq!(
            classify_message(&json),
            MessageKind::IncomingRequest { id: json!("srv-1") }
        );
    }

    #[test]
    fn classify_notification() {
        let json = json!({"jsonrpc": "2.0", "method": "notifications/progress"});
        assert_eq!(classify_message(&json), MessageKind::Notification);

        let null_id = json!({"jsonrpc": "2.0", "id": null, "method": "x"});
        assert_eq!(classify_message(&null_id), MessageKind::Notification);
    }

    #[test]
    fn classify_invalid() {
        assert_eq!(classify_message(&json!({"foo": 1})), MessageKind::Invalid);
    }

    struct Peer {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl Peer {
        async fn recv(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn send(&mut self, value: Value) {
            let mut line = value.to_string();
            line.push('\n');
            self.writer.write_all(line.as_bytes()).await.unwrap();
        }
    }

    fn pair() -> (McpTransport, Peer) {
        let (client, server) = tokio::io::duplex(8192);
        let (client_r, client_w) = tokio::io::split(client);
        let (server_r, server_w) = tokio::io::split(server);
        let transport = McpTransport::start("test", client_r, client_w);
        let peer = Peer {
            lines: BufReader::new(server_r).lines(),
            writer: server_w,
        };
        (transport, peer)
    }

    #[tokio::test]
    async fn test_request_response_correlation() {
        let (transport, mut peer) = pair();

        let server = tokio::spawn(async move {
            let request = peer.recv().await;
            assert_eq!(request["method"], "ping");
            // Noise before the real response must be skipped.
            peer.send(json!({"jsonrpc": "2.0", "method": "notifications/message"}))
                .await;
            peer.writer.write_all(b"not json at all\n").await.unwrap();
            peer.send(json!({"jsonrpc": "2.0", "id": request["id"], "result": {"ok": true}}))
                .await;
            peer
        });

        let result = transport
            .request("ping", None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result, json!({"ok": true}));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rpc_error() {
        let (transport, mut peer) = pair();

        tokio::spawn(async move {
            let request = peer.recv().await;
            peer.send(json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": {"code": -32602, "message": "bad params"}
            }))
            .await;
            peer
        });

        let err = transport
            .request("tools/call", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Rpc { code: -32602, .. }));
    }

    #[tokio::test]
    async fn test_provider_request_gets_method_not_found() {
        let (_transport, mut peer) = pair();

        peer.send(json!({"jsonrpc": "2.0", "id": "srv-7", "method": "roots/list"}))
            .await;
        let reply = peer.recv().await;
        assert_eq!(reply["id"], "srv-7");
        assert_eq!(reply["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_timeout_leaves_transport_usable() {
        let (transport, mut peer) = pair();

        let server = tokio::spawn(async move {
            let _ignored = peer.recv().await;
            let second = peer.recv().await;
            peer.send(json!({"jsonrpc": "2.0", "id": second["id"], "result": 2}))
                .await;
            peer
        });

        let err = transport
            .request("slow", None, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let ok = transport
            .request("fast", None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(ok, json!(2));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_exit_fails_pending_requests() {
        let (transport, mut peer) = pair();

        tokio::spawn(async move {
            let _ = peer.recv().await;
            drop(peer);
        });

        let err = transport
            .request("tools/list", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::TransportClosed));
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (transport, _peer) = pair();
        transport.close();
        transport.close();

        assert!(transport.is_closed());
        let err = transport
            .request("tools/list", None, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::TransportClosed));
        assert!(transport.notify("x", None).await.is_err());
    }
}
