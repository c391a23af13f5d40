//! Interactive chat module
//!
//! Provides a line-editor based interactive chat interface over the
//! orchestration engine.

mod command;
mod repl;

pub use command::ReplCommand;
pub use repl::ChatRepl;
