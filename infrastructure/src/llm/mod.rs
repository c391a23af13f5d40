//! Completion roles over OpenAI-compatible chat endpoints

pub mod openai;
pub mod prompts;

pub use openai::{ChatBackend, HttpChatBackend, OpenAiChatRole, OpenAiRoleConfig};
pub use prompts::{advisory_system_prompt, execution_system_prompt};
