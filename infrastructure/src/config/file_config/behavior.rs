//! Behavior and logging configuration (`[behavior]`, `[logging]`)

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How requests are processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBehaviorConfig {
    /// Run an extracted plan immediately (default: true)
    pub auto_execute: bool,
    /// Stream responses in the REPL (default: false)
    pub stream: bool,
}

impl Default for FileBehaviorConfig {
    fn default() -> Self {
        Self {
            auto_execute: true,
            stream: false,
        }
    }
}

/// Conversation transcript settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL transcript path; disabled when unset
    pub conversation_log: Option<PathBuf>,
}
