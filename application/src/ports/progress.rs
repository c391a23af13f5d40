//! Progress notification port
//!
//! Defines the interface for reporting engine state transitions.

use conductor_domain::{EngineState, SessionId};

/// Callback for progress updates while a request is processed
///
/// Implementations live in the presentation layer (spinner, plain text).
pub trait ProgressNotifier: Send + Sync {
    /// Called on every state transition of a request
    fn on_state(&self, session: &SessionId, state: EngineState);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_state(&self, _session: &SessionId, _state: EngineState) {}
}
