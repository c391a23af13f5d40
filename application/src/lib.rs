//! Application layer for mcp-conductor
//!
//! This crate contains the orchestration use case, the in-memory conversation
//! store, and the port definitions adapters implement.
//! It depends only on the domain layer.

pub mod conversation;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use conversation::ConversationStore;
pub use ports::{
    completion_role::{CompletionRole, FragmentStream, RoleError, collect_fragments},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    progress::{NoProgress, ProgressNotifier},
    tool_catalog::{EmptyCatalog, ToolCatalogPort},
};
pub use use_cases::orchestrate::{
    OrchestrationEngine, OrchestrationError, ProcessRequestInput, RequestOutcome, ResponseStream,
};
