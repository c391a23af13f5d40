//! Infrastructure layer for mcp-conductor
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the MCP stdio bridge, the tool registry,
//! OpenAI-compatible completion roles, the JSONL transcript writer and
//! configuration file loading.

pub mod config;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigLoader, ConfigSource, FileBehaviorConfig, FileConfig, FileLoggingConfig,
    FileProviderConfig, FileRolesConfig, MissingEnvVar,
};
pub use llm::{
    ChatBackend, HttpChatBackend, OpenAiChatRole, OpenAiRoleConfig, advisory_system_prompt,
    execution_system_prompt,
};
pub use logging::JsonlConversationLogger;
pub use mcp::{McpError, McpToolSession, McpTransport, StdioConnector};
pub use tools::{JsonSchemaToolConverter, RegistryStats, ToolHandle, ToolRegistry};
