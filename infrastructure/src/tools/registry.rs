//! Tool Registry
//!
//! The [`ToolRegistry`] aggregates every provider session and implements
//! [`ToolCatalogPort`]. It handles connection fan-out, capability discovery,
//! name resolution and invocation routing.
//!
//! # Usage
//!
//! ```ignore
//! use conductor_infrastructure::{StdioConnector, ToolRegistry};
//!
//! let registry = ToolRegistry::connect_all(&StdioConnector, &specs).await;
//!
//! assert!(registry.by_name("list_dir").is_some());
//! let result = registry.invoke("list_dir", json!({"path": "/tmp"})).await;
//! ```
//!
//! # Name Resolution
//!
//! Names match exactly. When two providers expose the same name, both handles
//! are kept under their providers, and the global lookup resolves to the one
//! registered last. Registration follows the order of the specs, not the
//! order in which connections complete. `provider.tool` always resolves
//! unambiguously via [`ToolRegistry::by_qualified_name`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use conductor_application::ToolCatalogPort;
use conductor_domain::{
    ConnectionError, ProviderSpec, RawCapability, ToolDescriptor, ToolError, ToolResult,
    ToolSession, ToolSessionConnector,
};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

/// A tool descriptor bound to the session that serves it.
pub struct ToolHandle {
    descriptor: ToolDescriptor,
    provider: String,
    session: Arc<dyn ToolSession>,
}

impl ToolHandle {
    pub fn new(descriptor: ToolDescriptor, session: Arc<dyn ToolSession>) -> Self {
        Self {
            provider: session.provider().to_string(),
            descriptor,
            session,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// `provider.tool`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.provider, self.descriptor.name)
    }

    /// Validate `arguments` against the descriptor, then call the provider.
    ///
    /// Invalid arguments never reach the provider.
    pub async fn invoke(&self, arguments: Value) -> ToolResult {
        if let Err(error) = self.descriptor.validate(&arguments) {
            debug!(tool = %self.descriptor.name, error = %error, "Rejected tool arguments");
            return ToolResult::failure(&self.descriptor.name, error).with_provider(&self.provider);
        }
        self.session.invoke(&self.descriptor.name, arguments).await
    }
}

impl std::fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolHandle")
            .field("provider", &self.provider)
            .field("name", &self.descriptor.name)
            .finish()
    }
}

/// Registry of every connected provider and its tools
///
/// Built once, read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    /// Sessions in registration order
    sessions: Vec<Arc<dyn ToolSession>>,
    /// Handles in registration order
    handles: Vec<Arc<ToolHandle>>,
    /// Provider name -> its handles
    by_provider: HashMap<String, Vec<Arc<ToolHandle>>>,
    /// Tool name -> last registered handle
    by_name: HashMap<String, Arc<ToolHandle>>,
    /// Providers that could not be connected
    failures: Vec<ConnectionError>,
    closed: AtomicBool,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every provider concurrently and register what succeeds.
    ///
    /// Never short-circuits: a provider that fails to start, handshake or
    /// list is logged, recorded in [`failures`](Self::failures) and skipped.
    pub async fn connect_all(connector: &dyn ToolSessionConnector, specs: &[ProviderSpec]) -> Self {
        let attempts = specs.iter().map(|spec| async move {
            let session = connector.connect(spec).await?;
            match session.list_capabilities().await {
                Ok(capabilities) => Ok::<_, ConnectionError>((session, capabilities)),
                Err(e) => {
                    session.close().await;
                    Err(e)
                }
            }
        });

        // join_all yields results in input order.
        let outcomes = join_all(attempts).await;

        let mut registry = Self::new();
        for outcome in outcomes {
            match outcome {
                Ok((session, capabilities)) => registry.register(session, capabilities),
                Err(e) => {
                    warn!(provider = e.provider(), error = %e, "Provider unavailable, skipping");
                    registry.failures.push(e);
                }
            }
        }

        let stats = registry.stats();
        info!(
            providers = stats.total_providers,
            tools = stats.total_tools,
            failed = stats.failed_providers,
            "Tool registry ready"
        );
        registry
    }

    /// Register one session with its advertised capabilities.
    pub fn register(&mut self, session: Arc<dyn ToolSession>, capabilities: Vec<RawCapability>) {
        let provider = session.provider().to_string();
        let provider_handles = self.by_provider.entry(provider.clone()).or_default();

        for capability in capabilities {
            let descriptor = ToolDescriptor::from_schema(
                capability.name,
                capability.description,
                &capability.input_schema,
            );
            let handle = Arc::new(ToolHandle::new(descriptor, Arc::clone(&session)));

            if let Some(previous) = self.by_name.get(handle.name()) {
                warn!(
                    tool = handle.name(),
                    previous = previous.provider(),
                    provider = %provider,
                    "Tool name registered by two providers; the later one wins"
                );
            }
            debug!(tool = handle.name(), provider = %provider, "Registered tool");

            // A provider repeating a name replaces its own earlier entry.
            provider_handles.retain(|h| h.name() != handle.name());
            provider_handles.push(Arc::clone(&handle));
            self.by_name
                .insert(handle.name().to_string(), Arc::clone(&handle));
            self.handles.push(handle);
        }

        self.sessions.push(session);
    }

    /// Every handle, in registration order, shadowed ones included.
    pub fn all_handles(&self) -> &[Arc<ToolHandle>] {
        &self.handles
    }

    /// Handles served by one provider.
    pub fn handles_by_provider(&self, provider: &str) -> &[Arc<ToolHandle>] {
        self.by_provider
            .get(provider)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Global lookup; the last registered handle wins.
    pub fn by_name(&self, name: &str) -> Option<&Arc<ToolHandle>> {
        self.by_name.get(name)
    }

    /// Lookup by `provider.tool`.
    ///
    /// The provider part is everything up to the first dot.
    pub fn by_qualified_name(&self, qualified: &str) -> Option<&Arc<ToolHandle>> {
        let (provider, name) = qualified.split_once('.')?;
        self.handles_by_provider(provider)
            .iter()
            .find(|h| h.name() == name)
    }

    /// Providers that failed to connect.
    pub fn failures(&self) -> &[ConnectionError] {
        &self.failures
    }

    /// Connected provider names, in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.sessions.iter().map(|s| s.provider()).collect()
    }

    /// Handles that the global lookup resolves to, in registration order.
    fn effective_handles(&self) -> impl Iterator<Item = &Arc<ToolHandle>> {
        self.handles.iter().filter(|h| {
            self.by_name
                .get(h.name())
                .is_some_and(|winner| Arc::ptr_eq(winner, h))
        })
    }

    /// Get statistics about registered tools
    pub fn stats(&self) -> RegistryStats {
        let tools_per_provider = self
            .by_provider
            .iter()
            .map(|(provider, handles)| (provider.clone(), handles.len()))
            .collect();

        RegistryStats {
            total_providers: self.sessions.len(),
            total_tools: self.by_name.len(),
            failed_providers: self.failures.len(),
            tools_per_provider,
        }
    }
}

/// Statistics about the registry
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub total_providers: usize,
    /// Distinct tool names
    pub total_tools: usize,
    pub failed_providers: usize,
    pub tools_per_provider: HashMap<String, usize>,
}

#[async_trait]
impl ToolCatalogPort for ToolRegistry {
    fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.effective_handles()
            .map(|h| h.descriptor().clone())
            .collect()
    }

    fn catalogue_summary(&self) -> BTreeMap<String, Vec<String>> {
        self.sessions
            .iter()
            .map(|session| {
                let provider = session.provider();
                let lines = self
                    .handles_by_provider(provider)
                    .iter()
                    .map(|h| format!("{}: {}", h.name(), h.descriptor().description))
                    .collect();
                (provider.to_string(), lines)
            })
            .collect()
    }

    fn has_tool(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    async fn invoke(&self, name: &str, arguments: Value) -> ToolResult {
        match self.by_name(name) {
            Some(handle) => handle.invoke(arguments).await,
            None => ToolResult::failure(name, ToolError::not_found(name)),
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        join_all(self.sessions.iter().map(|s| s.close())).await;
        info!(providers = self.sessions.len(), "Tool registry closed");
    }
}
