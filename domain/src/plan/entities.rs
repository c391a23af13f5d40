//! Task plan entities
//!
//! A [`TaskPlan`] is the structured instruction set recovered from advisory
//! text. It is only ever built by the plan extractor and is never mutated.

use serde::{Deserialize, Serialize};

/// One step of a task plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// 1-based step index
    pub step: u32,
    /// Name of the action (usually a tool name)
    pub action: String,
    /// Parameters for the action
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// Human description of the step
    pub description: String,
}

impl ExecutionStep {
    pub fn new(step: u32, action: impl Into<String>) -> Self {
        Self {
            step,
            action: action.into(),
            parameters: serde_json::Map::new(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// The description, or the action name when the description is blank.
    pub fn summary(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.action
        } else {
            &self.description
        }
    }
}

/// Structured plan extracted from advisory output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub task_description: String,
    /// Tool names in the order the advisor listed them
    pub required_tools: Vec<String>,
    pub execution_steps: Vec<ExecutionStep>,
    pub expected_outcome: String,
}

impl TaskPlan {
    pub fn new(task_description: impl Into<String>) -> Self {
        Self {
            task_description: task_description.into(),
            ..Default::default()
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.required_tools.push(tool.into());
        self
    }

    pub fn with_step(mut self, step: ExecutionStep) -> Self {
        self.execution_steps.push(step);
        self
    }

    pub fn with_expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }

    /// Render the prompt handed to the execution role.
    ///
    /// Steps are numbered by position and keep their original order.
    pub fn execution_prompt(&self) -> String {
        let mut prompt = format!("Execute this task: {}\n\nSteps:\n", self.task_description);

        for (i, step) in self.execution_steps.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, step.summary()));
        }

        prompt.push_str(&format!("\nExpected outcome: {}", self.expected_outcome));
        prompt
    }
}
