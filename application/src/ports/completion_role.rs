//! Completion role port
//!
//! A *role* is a language-model persona (advisor or executor) that answers
//! messages on named threads. The role keeps each thread's history itself;
//! callers only say which thread a message belongs to.

use async_trait::async_trait;
use conductor_domain::ThreadId;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

/// Errors that can occur while talking to a completion role
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoleError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,
}

/// Ordered text fragments produced by a role.
pub type FragmentStream = BoxStream<'static, Result<String, RoleError>>;

/// A completion service bound to one persona.
#[async_trait]
pub trait CompletionRole: Send + Sync {
    /// Short name used in logs ("advisor", "executor")
    fn name(&self) -> &str;

    /// Send a message on a thread and wait for the full reply.
    async fn send(&self, thread: &ThreadId, message: &str) -> Result<String, RoleError>;

    /// Send a message on a thread and receive the reply in fragments.
    ///
    /// Default implementation calls `send()` and yields its result as a
    /// single fragment.
    async fn stream(&self, thread: &ThreadId, message: &str) -> Result<FragmentStream, RoleError> {
        let reply = self.send(thread, message).await?;
        Ok(stream::once(async move { Ok(reply) }).boxed())
    }
}

/// Drain a fragment stream into one string.
pub async fn collect_fragments(mut fragments: FragmentStream) -> Result<String, RoleError> {
    let mut text = String::new();
    while let Some(fragment) = fragments.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoRole;

    #[async_trait]
    impl CompletionRole for EchoRole {
        fn name(&self) -> &str {
            "echo"
        }

        async fn send(&self, thread: &ThreadId, message: &str) -> Result<String, RoleError> {
            Ok(format!("{}: {}", thread, message))
        }
    }

    #[tokio::test]
    async fn test_default_stream_yields_single_fragment() {
        let thread = ThreadId::new("advisory_1");
        let fragments: Vec<_> = EchoRole
            .stream(&thread, "hi")
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(fragments, vec![Ok("advisory_1: hi".to_string())]);
    }

    #[tokio::test]
    async fn test_collect_fragments_stops_at_error() {
        let fragments: FragmentStream = stream::iter(vec![
            Ok("a".to_string()),
            Err(RoleError::Timeout),
            Ok("b".to_string()),
        ])
        .boxed();

        assert_eq!(collect_fragments(fragments).await, Err(RoleError::Timeout));
    }
}
