//! Plan extraction from advisory text.
//!
//! The advisory role is asked to append a fenced ` ```json ` block describing
//! the work to do. This module recovers that block and decodes it into a
//! [`TaskPlan`]. Extraction never fails loudly: anything unexpected means
//! "no plan".
//!
//! Expected block shape (every field optional):
//!
//! ```json
//! {
//!   "task_description": "string",
//!   "required_tools": ["tool", ...],
//!   "execution_steps": [
//!     {"step": 1, "action": "tool", "parameters": {...}, "description": "string"}
//!   ],
//!   "expected_outcome": "string"
//! }
//! ```

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::entities::{ExecutionStep, TaskPlan};

const OPEN_FENCE: &str = "```json";
const CLOSE_FENCE: &str = "```";

/// Why no plan could be recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanParseError {
    #[error("no ```json block found")]
    NoBlock,

    #[error("```json block is empty")]
    EmptyBlock,

    #[error("block is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("block is not a JSON object")]
    NotAnObject,

    #[error("block does not match the plan shape: {0}")]
    InvalidShape(String),
}

/// Extract a plan from advisory text, or `None`.
///
/// The reason for a miss is logged at debug level.
pub fn extract_task_plan(text: &str) -> Option<TaskPlan> {
    match parse_task_plan(text) {
        Ok(plan) => Some(plan),
        Err(e) => {
            debug!("No task plan extracted: {}", e);
            None
        }
    }
}

/// Extract a plan from advisory text, reporting why extraction failed.
pub fn parse_task_plan(text: &str) -> Result<TaskPlan, PlanParseError> {
    let block = find_json_block(text)?;

    if block.trim().is_empty() {
        return Err(PlanParseError::EmptyBlock);
    }

    let value: serde_json::Value =
        serde_json::from_str(&block).map_err(|e| PlanParseError::InvalidJson(e.to_string()))?;

    if !value.is_object() {
        return Err(PlanParseError::NotAnObject);
    }

    let wire: WirePlan =
        serde_json::from_value(value).map_err(|e| PlanParseError::InvalidShape(e.to_string()))?;

    wire.into_plan()
}

/// Return the interior of the first ` ```json ` fenced block.
///
/// A block left open runs to the end of the text.
fn find_json_block(text: &str) -> Result<String, PlanParseError> {
    let mut lines = text.lines();

    if !lines.by_ref().any(|line| line.trim().starts_with(OPEN_FENCE)) {
        return Err(PlanParseError::NoBlock);
    }

    let interior: Vec<&str> = lines.take_while(|line| line.trim() != CLOSE_FENCE).collect();
    Ok(interior.join("\n"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WirePlan {
    task_description: String,
    required_tools: Vec<String>,
    execution_steps: Vec<WireStep>,
    expected_outcome: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireStep {
    step: Option<StepIndex>,
    action: String,
    parameters: serde_json::Map<String, serde_json::Value>,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StepIndex {
    Number(u32),
    Text(String),
}

impl WirePlan {
    fn into_plan(self) -> Result<TaskPlan, PlanParseError> {
        let mut steps = Vec::with_capacity(self.execution_steps.len());

        for (position, step) in self.execution_steps.into_iter().enumerate() {
            let index = match step.step {
                Some(StepIndex::Number(n)) => n,
                Some(StepIndex::Text(s)) => s.trim().parse().map_err(|_| {
                    PlanParseError::InvalidShape(format!("step index '{}' is not a number", s))
                })?,
                None => (position + 1) as u32,
            };

            steps.push(ExecutionStep {
                step: index,
                action: step.action,
                parameters: step.parameters,
                description: step.description,
            });
        }

        Ok(TaskPlan {
            task_description: self.task_description,
            required_tools: self.required_tools,
            execution_steps: steps,
            expected_outcome: self.expected_outcome,
        })
    }
}
