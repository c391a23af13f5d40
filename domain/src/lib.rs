//! Domain layer for mcp-conductor
//!
//! This crate contains the core types and pure logic. It has no dependencies
//! on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! Remote capabilities discovered from provider processes. Each one becomes a
//! [`ToolDescriptor`], a typed argument contract that can validate a call
//! before it is sent.
//!
//! ## Plans
//!
//! The advisory role describes the work to do in a fenced JSON block.
//! [`extract_task_plan`] turns that block into a [`TaskPlan`], or gives up
//! quietly.
//!
//! ## Conversations
//!
//! Each [`ConversationContext`] pairs an advisory thread with an execution
//! thread and keeps an append-only history of executed requests.

pub mod conversation;
pub mod core;
pub mod orchestration;
pub mod plan;
pub mod tool;

// Re-export commonly used types
pub use conversation::{
    ConversationContext, ConversationSummary, ExecutionRecord, Message, Role, SessionId, ThreadId,
};
pub use core::{error::DomainError, string::truncate};
pub use orchestration::EngineState;
pub use plan::{ExecutionStep, PlanParseError, TaskPlan, extract_task_plan, parse_task_plan};
pub use tool::{
    ConnectionError, DefaultToolValidator, ParameterKind, ProviderSpec, RawCapability, ToolCall,
    ToolDescriptor, ToolError, ToolParameter, ToolResult, ToolResultMetadata, ToolSession,
    ToolSessionConnector, ToolValidator,
};
