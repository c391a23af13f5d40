//! Tool domain value objects: invocation results and errors
//!
//! Remote invocation never raises. Every failure mode (bad arguments, unknown
//! tool, remote error, timeout, dead transport) becomes a [`ToolResult`]
//! carrying a [`ToolError`], so one failing call never disturbs the others.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool invocation.
///
/// | Code | Description |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Arguments do not satisfy the tool's contract |
/// | `NOT_FOUND` | No tool with that name in the catalogue |
/// | `EXECUTION_FAILED` | Provider reported an error or returned garbage |
/// | `TIMEOUT` | Provider did not answer in time |
/// | `TRANSPORT_CLOSED` | Provider process is gone |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "TIMEOUT")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const EXECUTION_FAILED: &'static str = "EXECUTION_FAILED";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const TRANSPORT_CLOSED: &'static str = "TRANSPORT_CLOSED";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(tool: impl Into<String>) -> Self {
        Self::new(Self::NOT_FOUND, format!("Tool not found: {}", tool.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGUMENT, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(Self::EXECUTION_FAILED, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            Self::TIMEOUT,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn transport_closed(provider: impl Into<String>) -> Self {
        Self::new(
            Self::TRANSPORT_CLOSED,
            format!("Connection to provider '{}' is closed", provider.into()),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was invoked
    pub tool_name: String,
    /// Whether the invocation succeeded
    pub success: bool,
    /// Output text (for successful invocations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error information (for failed invocations)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

/// Metadata about one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Wall-clock duration in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Provider that served the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.metadata.provider = Some(provider.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Text to hand back to a language model: the output on success, the
    /// rendered error otherwise.
    pub fn as_text(&self) -> String {
        match (&self.output, &self.error) {
            (Some(output), _) if self.success => output.clone(),
            (_, Some(error)) => format!("Error: {}", error),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error() {
        let err = ToolError::not_found("list_dir").with_details("no provider exposes it");

        assert_eq!(err.code, ToolError::NOT_FOUND);
        assert!(err.message.contains("list_dir"));
        assert_eq!(
            err.to_string(),
            "[NOT_FOUND] Tool not found: list_dir (no provider exposes it)"
        );
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("list_dir", "a.txt\nb.txt")
            .with_provider("filesystem")
            .with_duration(12);

        assert!(result.is_success());
        assert_eq!(result.output(), Some("a.txt\nb.txt"));
        assert!(result.error().is_none());
        assert_eq!(result.metadata.provider.as_deref(), Some("filesystem"));
        assert_eq!(result.as_text(), "a.txt\nb.txt");
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("list_dir", ToolError::transport_closed("filesystem"));

        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert_eq!(result.error().unwrap().code, ToolError::TRANSPORT_CLOSED);
        assert!(result.as_text().starts_with("Error: [TRANSPORT_CLOSED]"));
    }
}
