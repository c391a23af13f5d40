//! Conversation state management

pub mod store;

pub use store::ConversationStore;
