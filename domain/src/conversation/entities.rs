//! Conversation entities
//!
//! A conversation (session) owns two threads, one per role, plus the plan
//! currently on the table and an append-only execution history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::TaskPlan;

/// Globally unique conversation identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Thread the advisory role uses for this session.
    pub fn advisory_thread(&self) -> ThreadId {
        ThreadId(format!("advisory_{}", self.0))
    }

    /// Thread the execution role uses for this session.
    pub fn execution_thread(&self) -> ThreadId {
        ThreadId(format!("execution_{}", self.0))
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one role's message thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One request that went all the way through execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub user_input: String,
    pub advisory_response: String,
    pub plan: Option<TaskPlan>,
    pub execution_result: String,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(
        user_input: impl Into<String>,
        advisory_response: impl Into<String>,
        plan: Option<TaskPlan>,
        execution_result: impl Into<String>,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            advisory_response: advisory_response.into(),
            plan,
            execution_result: execution_result.into(),
            timestamp: Utc::now(),
        }
    }
}

/// State of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub session_id: SessionId,
    pub advisory_thread_id: ThreadId,
    pub execution_thread_id: ThreadId,
    pub current_plan: Option<TaskPlan>,
    pub execution_history: Vec<ExecutionRecord>,
    pub created_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            advisory_thread_id: session_id.advisory_thread(),
            execution_thread_id: session_id.execution_thread(),
            session_id,
            current_plan: None,
            execution_history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn last_record(&self) -> Option<&ExecutionRecord> {
        self.execution_history.last()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            session_id: self.session_id.clone(),
            execution_count: self.execution_history.len(),
            has_plan: self.current_plan.is_some(),
            last_record: self.last_record().cloned(),
        }
    }
}

/// Short overview of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub session_id: SessionId,
    pub execution_count: usize,
    pub has_plan: bool,
    pub last_record: Option<ExecutionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_thread_ids_derive_from_session() {
        let id = SessionId::from("abc");
        assert_eq!(id.advisory_thread().as_str(), "advisory_abc");
        assert_eq!(id.execution_thread().as_str(), "execution_abc");

        let ctx = ConversationContext::new(id.clone());
        assert_eq!(ctx.advisory_thread_id, id.advisory_thread());
        assert_eq!(ctx.execution_thread_id, id.execution_thread());
    }

    #[test]
    fn test_summary() {
        let mut ctx = ConversationContext::new(SessionId::generate());
        let empty = ctx.summary();
        assert_eq!(empty.execution_count, 0);
        assert!(!empty.has_plan);
        assert!(empty.last_record.is_none());

        ctx.current_plan = Some(TaskPlan::new("list"));
        ctx.execution_history
            .push(ExecutionRecord::new("list files", "ok", None, "a.txt"));

        let summary = ctx.summary();
        assert_eq!(summary.execution_count, 1);
        assert!(summary.has_plan);
        assert_eq!(summary.last_record.unwrap().execution_result, "a.txt");
    }

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let id = SessionId::from("abc");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("abc"));
    }
}
