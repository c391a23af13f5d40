//! MCP stdio bridge
//!
//! Speaks newline-delimited JSON-RPC 2.0 to provider processes:
//!
//! - [`protocol`] — wire types (`initialize`, `tools/list`, `tools/call`)
//! - [`transport`] — reader task, request correlation, serialized writes
//! - [`session`] — [`McpToolSession`] and the spawning [`StdioConnector`]

pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::McpError;
pub use session::{McpToolSession, StdioConnector, expand_args, expand_args_with, placeholder_var};
pub use transport::McpTransport;
