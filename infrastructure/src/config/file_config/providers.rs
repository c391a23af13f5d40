//! Tool provider configuration (`[providers.<name>]` section)

use std::collections::BTreeMap;
use std::time::Duration;

use conductor_domain::ProviderSpec;
use serde::{Deserialize, Serialize};

/// One MCP provider process.
///
/// The same shape as an entry of a `{"mcpServers": {...}}` JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Executable to launch
    pub command: String,
    /// Arguments; `${VAR}` entries are expanded at connect time
    pub args: Vec<String>,
    /// Extra environment variables for the child
    pub env: BTreeMap<String, String>,
    /// Human description, shown by `/tools`
    pub description: Option<String>,
    /// Per-call timeout in seconds (default: 120)
    pub timeout_secs: Option<u64>,
    /// Handshake and listing timeout in seconds (default: 30)
    pub request_timeout_secs: Option<u64>,
}

impl FileProviderConfig {
    /// Build the runtime spec for the provider called `name`.
    pub fn to_spec(&self, name: &str) -> ProviderSpec {
        let mut spec = ProviderSpec::new(name, &self.command).with_args(self.args.iter().cloned());
        spec.env = self.env.clone();
        spec.description = self.description.clone();
        if let Some(secs) = self.timeout_secs {
            spec = spec.with_call_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.request_timeout_secs {
            spec = spec.with_request_timeout(Duration::from_secs(secs));
        }
        spec
    }
}
