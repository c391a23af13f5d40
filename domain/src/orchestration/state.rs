//! Per-request engine states

use serde::{Deserialize, Serialize};

/// Where a request is in the advise → execute pipeline.
///
/// ```text
/// Advising ──▶ PlanCheck ──▶ Executing ──▶ Done
///                  │                        ▲
///                  └────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Waiting on the advisory role
    Advising,
    /// Looking for a plan in the advisory text
    PlanCheck,
    /// Waiting on the execution role
    Executing,
    /// Request finished
    Done,
}

impl EngineState {
    pub fn as_str(&self) -> &str {
        match self {
            EngineState::Advising => "advising",
            EngineState::PlanCheck => "plan_check",
            EngineState::Executing => "executing",
            EngineState::Done => "done",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            EngineState::Advising => "Consulting advisor",
            EngineState::PlanCheck => "Checking for a plan",
            EngineState::Executing => "Executing plan",
            EngineState::Done => "Done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Done)
    }

    /// Whether `next` may follow `self` within one request.
    pub fn can_transition_to(&self, next: EngineState) -> bool {
        matches!(
            (self, next),
            (EngineState::Advising, EngineState::PlanCheck)
                | (EngineState::PlanCheck, EngineState::Executing)
                | (EngineState::PlanCheck, EngineState::Done)
                | (EngineState::Executing, EngineState::Done)
        )
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(EngineState::Advising.can_transition_to(EngineState::PlanCheck));
        assert!(EngineState::PlanCheck.can_transition_to(EngineState::Done));
        assert!(EngineState::PlanCheck.can_transition_to(EngineState::Executing));
        assert!(EngineState::Executing.can_transition_to(EngineState::Done));

        assert!(!EngineState::Advising.can_transition_to(EngineState::Executing));
        assert!(!EngineState::Done.can_transition_to(EngineState::Advising));
        assert!(EngineState::Done.is_terminal());
    }

    #[test]
    fn test_as_str() {
        assert_eq!(EngineState::PlanCheck.as_str(), "plan_check");
        assert_eq!(
            serde_json::to_value(EngineState::PlanCheck).unwrap(),
            serde_json::json!("plan_check")
        );
    }
}
