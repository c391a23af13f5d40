//! In-memory conversation store
//!
//! Owns every [`ConversationContext`]. Readers get clones, never references,
//! and locks are only held for the map access itself.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use conductor_domain::{
    ConversationContext, ConversationSummary, DomainError, ExecutionRecord, SessionId, TaskPlan,
};
use tracing::debug;

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<SessionId, ConversationContext>,
    /// Session ids in creation order
    order: Vec<SessionId>,
}

/// Keyed conversation state.
///
/// Different sessions never interfere. Same-session writers are expected to
/// be sequential; there is no per-session lock.
#[derive(Default)]
pub struct ConversationStore {
    inner: RwLock<StoreInner>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty conversation and return its id.
    pub fn create(&self) -> SessionId {
        let id = SessionId::generate();
        let mut inner = self.write();
        inner
            .sessions
            .insert(id.clone(), ConversationContext::new(id.clone()));
        inner.order.push(id.clone());
        debug!(session = %id, "Created conversation");
        id
    }

    /// Snapshot of a conversation.
    pub fn get(&self, id: &SessionId) -> Option<ConversationContext> {
        self.read().sessions.get(id).cloned()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.read().sessions.contains_key(id)
    }

    fn update<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut ConversationContext) -> T,
    ) -> Result<T, DomainError> {
        let mut inner = self.write();
        let context = inner
            .sessions
            .get_mut(id)
            .ok_or_else(|| DomainError::SessionNotFound(id.clone()))?;
        Ok(f(context))
    }

    /// Append a record to a conversation's history.
    pub fn append_execution(
        &self,
        id: &SessionId,
        record: ExecutionRecord,
    ) -> Result<(), DomainError> {
        self.update(id, |ctx| ctx.execution_history.push(record))
    }

    /// Replace (or clear) the current plan.
    pub fn set_plan(&self, id: &SessionId, plan: Option<TaskPlan>) -> Result<(), DomainError> {
        self.update(id, |ctx| ctx.current_plan = plan)
    }

    /// Remove and return the current plan.
    pub fn take_plan(&self, id: &SessionId) -> Result<Option<TaskPlan>, DomainError> {
        self.update(id, |ctx| ctx.current_plan.take())
    }

    /// Session ids in creation order.
    pub fn list(&self) -> Vec<SessionId> {
        self.read().order.clone()
    }

    pub fn summarize(&self, id: &SessionId) -> Option<ConversationSummary> {
        self.read().sessions.get(id).map(ConversationContext::summary)
    }

    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every conversation.
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.sessions.clear();
        inner.order.clear();
    }
}
