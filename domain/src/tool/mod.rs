//! Tool domain module
//!
//! Remote capabilities are discovered from provider processes and turned into
//! typed contracts:
//!
//! ```text
//! ┌───────────────┐    ┌────────────────┐    ┌──────────────┐
//! │ RawCapability │───▶│ ToolDescriptor │───▶│ ToolResult   │
//! │ (wire schema) │    │ (contract)     │    │ (output)     │
//! └───────────────┘    └────────────────┘    └──────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolDescriptor`] — name, description and ordered typed parameters
//! - [`ToolCall`] — an invocation request with arguments
//! - [`ToolResult`] / [`ToolError`] — invocation outcome, failures as data
//! - [`ToolValidator`] — pure argument validation against a descriptor
//! - [`ToolSession`] / [`ToolSessionConnector`] — connection to one provider
//!
//! Everything here is free of I/O. The stdio transport lives in the
//! infrastructure crate.

pub mod entities;
pub mod provider;
pub mod traits;
pub mod value_objects;

pub use entities::{ParameterKind, ToolCall, ToolDescriptor, ToolParameter};
pub use provider::{ConnectionError, ProviderSpec, RawCapability, ToolSession, ToolSessionConnector};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolResult, ToolResultMetadata};
