//! Tool schema export.
//!
//! Renders [`ToolDescriptor`]s in the chat-completions `tools` format so the
//! execution role can advertise every discovered tool as a function.

use conductor_domain::ToolDescriptor;
use serde_json::{Value, json};

/// Converts descriptors into function-calling tool definitions.
pub struct JsonSchemaToolConverter;

impl JsonSchemaToolConverter {
    /// One `{"type": "function", "function": {...}}` entry.
    pub fn tool_to_schema(&self, tool: &ToolDescriptor) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.to_json_schema(),
            }
        })
    }

    /// Every descriptor, in the order given.
    pub fn all_tools_schema(&self, tools: &[ToolDescriptor]) -> Vec<Value> {
        tools.iter().map(|t| self.tool_to_schema(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::{ParameterKind, ToolParameter};

    #[test]
    fn test_tool_to_schema() {
        let converter = JsonSchemaToolConverter;
        let tool = ToolDescriptor::new("read_file", "Read file contents")
            .with_parameter(ToolParameter::new("path", "File path to read", true))
            .with_parameter(
                ToolParameter::new("max_lines", "Max lines to read", false)
                    .with_kind(ParameterKind::Integer),
            );

        let schema = converter.tool_to_schema(&tool);

        assert_eq!(schema["type"], "function");
        let function = &schema["function"];
        assert_eq!(function["name"], "read_file");
        assert_eq!(function["description"], "Read file contents");
        assert_eq!(function["parameters"]["type"], "object");

        let path_prop = &function["parameters"]["properties"]["path"];
        assert_eq!(path_prop["type"], "string");
        assert_eq!(path_prop["description"], "File path to read");
        assert_eq!(
            function["parameters"]["properties"]["max_lines"]["type"],
            "integer"
        );

        let required = function["parameters"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "path");
    }

    #[test]
    fn test_all_tools_schema_keeps_order() {
        let converter = JsonSchemaToolConverter;
        let tools = vec![
            ToolDescriptor::new("write_file", "Write file"),
            ToolDescriptor::new("list_dir", "List directory"),
        ];

        let schemas = converter.all_tools_schema(&tools);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0]["function"]["name"], "write_file");
        assert_eq!(schemas[1]["function"]["name"], "list_dir");
        assert_eq!(
            schemas[1]["function"]["parameters"]["properties"],
            json!({})
        );
    }
}
