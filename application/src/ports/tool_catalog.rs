//! Tool catalogue port
//!
//! The read-only view of discovered tools that the engine and the execution
//! role work against. The registry in the infrastructure layer implements it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use conductor_domain::{ToolDescriptor, ToolResult};

/// Port for tool discovery results and invocation
#[async_trait]
pub trait ToolCatalogPort: Send + Sync {
    /// Every reachable tool, in registration order
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    /// Provider name → "name: description" lines
    fn catalogue_summary(&self) -> BTreeMap<String, Vec<String>>;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.descriptors().iter().any(|d| d.name == name)
    }

    /// Names of all available tools
    fn tool_names(&self) -> Vec<String> {
        self.descriptors().into_iter().map(|d| d.name).collect()
    }

    /// Invoke a tool by name. Failures are carried in the result.
    async fn invoke(&self, name: &str, arguments: serde_json::Value) -> ToolResult;

    /// Release every provider connection
    async fn close(&self);
}

/// Empty catalogue, for running without any providers.
pub struct EmptyCatalog;

#[async_trait]
impl ToolCatalogPort for EmptyCatalog {
    fn descriptors(&self) -> Vec<ToolDescriptor> {
        Vec::new()
    }

    fn catalogue_summary(&self) -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }

    async fn invoke(&self, name: &str, _arguments: serde_json::Value) -> ToolResult {
        ToolResult::failure(name, conductor_domain::ToolError::not_found(name))
    }

    async fn close(&self) {}
}
