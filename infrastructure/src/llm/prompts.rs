//! System prompts for the two roles.

use std::collections::BTreeMap;

use conductor_domain::ToolDescriptor;

/// Fenced plan template shown to the advisor.
const PLAN_FORMAT: &str = r#"```json
{
    "task_description": "Clear description of the task",
    "required_tools": ["tool_a", "tool_b"],
    "execution_steps": [
        {
            "step": 1,
            "action": "tool_name",
            "parameters": {"param": "value"},
            "description": "What this step does"
        }
    ],
    "expected_outcome": "What should happen"
}
```"#;

/// Prompt for the advisory role, listing the catalogue by provider.
pub fn advisory_system_prompt(catalogue: &BTreeMap<String, Vec<String>>) -> String {
    let tools = if catalogue.is_empty() {
        "(no tools are currently available)".to_string()
    } else {
        catalogue
            .iter()
            .map(|(provider, lines)| {
                let mut section = format!("**Provider {}:**", provider);
                for line in lines {
                    section.push_str("\n  - ");
                    section.push_str(line);
                }
                section
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an advisory assistant. You analyse user requests and plan how to \
fulfil them with the tools listed below. You never call tools yourself.

AVAILABLE TOOLS:
{tools}

RESPONSE FORMAT:
- For general questions, answer directly and do not include a plan.
- When the request needs tools, explain what you will do, then include exactly one \
execution plan in this format:

{PLAN_FORMAT}

Only reference tools from the list above. If the needed tools are missing, say what \
cannot be done."
    )
}

/// Prompt for the execution role.
pub fn execution_system_prompt(tools: &[ToolDescriptor]) -> String {
    let tool_list = if tools.is_empty() {
        "(none)".to_string()
    } else {
        tools
            .iter()
            .map(|t| format!("- {}: {}", t.name, t.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are an execution assistant. You carry out task plans step by step \
using the available tools.

AVAILABLE TOOLS:
{tool_list}

INSTRUCTIONS:
- Execute each step in order, calling tools exactly as needed.
- Use only real tool output; never invent results.
- If a step fails, say what went wrong and whether you could work around it.
- Finish with a concise summary of the results."
    )
}
