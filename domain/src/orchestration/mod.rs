//! Orchestration domain
//!
//! Pure description of the per-request state machine. The engine that drives
//! it lives in the application crate.

pub mod state;

pub use state::EngineState;
