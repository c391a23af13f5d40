//! Task plans and their extraction from free text

pub mod entities;
pub mod parser;

pub use entities::{ExecutionStep, TaskPlan};
pub use parser::{PlanParseError, extract_task_plan, parse_task_plan};
