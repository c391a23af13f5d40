//! Conversation domain.
//!
//! - [`entities::ConversationContext`] — per-session state
//! - [`entities::ExecutionRecord`] — one executed request
//! - [`message::Message`] — a single message within a role's thread

pub mod entities;
pub mod message;

pub use entities::{ConversationContext, ConversationSummary, ExecutionRecord, SessionId, ThreadId};
pub use message::{Message, Role};
