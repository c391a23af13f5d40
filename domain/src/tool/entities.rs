//! Tool domain entities
//!
//! A [`ToolDescriptor`] is the typed argument contract of one remote
//! capability. It is built once from the capability's JSON schema by
//! [`ToolDescriptor::from_schema`] and never changes afterwards.

use serde::{Deserialize, Serialize};

use super::traits::{DefaultToolValidator, ToolValidator};
use super::value_objects::ToolError;

/// Semantic kind of a tool parameter.
///
/// Mirrors the primitive JSON-schema types. Anything a provider declares that
/// is not one of these (a union, an unknown name, or no type at all) is
/// reported as [`String`](Self::String) on an undeclared parameter, which the
/// validator does not type-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Integer,
    Float,
    Boolean,
    Object,
    Array,
}

impl ParameterKind {
    /// Map a JSON-schema `type` value to a kind.
    ///
    /// Returns `None` unless the value is a single primitive type name.
    pub fn from_schema_type(schema_type: Option<&serde_json::Value>) -> Option<Self> {
        match schema_type.and_then(|t| t.as_str())? {
            "string" => Some(ParameterKind::String),
            "integer" => Some(ParameterKind::Integer),
            "number" => Some(ParameterKind::Float),
            "boolean" => Some(ParameterKind::Boolean),
            "object" => Some(ParameterKind::Object),
            "array" => Some(ParameterKind::Array),
            _ => None,
        }
    }

    /// The JSON-schema `type` this kind renders back to.
    pub fn schema_type(&self) -> &'static str {
        match self {
            ParameterKind::String => "string",
            ParameterKind::Integer => "integer",
            ParameterKind::Float => "number",
            ParameterKind::Boolean => "boolean",
            ParameterKind::Object => "object",
            ParameterKind::Array => "array",
        }
    }

    /// Whether a JSON value is acceptable for this kind.
    ///
    /// Integers are accepted where a float is declared.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            ParameterKind::String => value.is_string(),
            ParameterKind::Integer => value.is_i64() || value.is_u64(),
            ParameterKind::Float => value.is_number(),
            ParameterKind::Boolean => value.is_boolean(),
            ParameterKind::Object => value.is_object(),
            ParameterKind::Array => value.is_array(),
        }
    }
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.schema_type())
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Declared kind
    pub kind: ParameterKind,
    /// False when `kind` is the string fallback for a type the schema did not
    /// state as a single primitive
    #[serde(default = "declared_by_default")]
    pub declared: bool,
}

fn declared_by_default() -> bool {
    true
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            kind: ParameterKind::String,
            declared: true,
        }
    }

    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self.declared = true;
        self
    }

    /// Mark the kind as a fallback: any non-null value is accepted.
    pub fn undeclared(mut self) -> Self {
        self.kind = ParameterKind::String;
        self.declared = false;
        self
    }

    /// Whether a JSON value satisfies this parameter's type.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        !self.declared || self.kind.accepts(value)
    }
}

/// Typed description of a remote capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name of the tool, unique within its provider
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameters in schema declaration order
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Build a descriptor from a capability's JSON-schema `inputSchema`.
    ///
    /// Parameters follow the declaration order of `properties`. A parameter
    /// is required only when listed in `required`; optional parameters carry
    /// no default value.
    pub fn from_schema(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &serde_json::Value,
    ) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
            .unwrap_or_default();

        let mut descriptor = Self::new(name, description);

        if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
            for (param_name, param_schema) in properties {
                let param_description = param_schema
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or("");
                let param = ToolParameter::new(
                    param_name.as_str(),
                    param_description,
                    required.contains(&param_name.as_str()),
                );
                let param = match ParameterKind::from_schema_type(param_schema.get("type")) {
                    Some(kind) => param.with_kind(kind),
                    None => param.undeclared(),
                };

                descriptor = descriptor.with_parameter(param);
            }
        }

        descriptor
    }

    /// Look up a parameter by name.
    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ToolParameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Check an argument payload against this contract.
    pub fn validate(&self, arguments: &serde_json::Value) -> Result<(), ToolError> {
        DefaultToolValidator.validate(arguments, self)
    }

    /// Render the contract back to a JSON-schema object.
    pub fn to_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let property = if param.declared {
                serde_json::json!({
                    "type": param.kind.schema_type(),
                    "description": param.description,
                })
            } else {
                serde_json::json!({ "description": param.description })
            };
            properties.insert(param.name.clone(), property);
            if param.required {
                required.push(serde_json::json!(param.name));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A request to invoke a tool, as produced by a language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-assigned call id, echoed back with the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub tool_name: String,
    /// Argument object
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            id: None,
            tool_name: tool_name.into(),
            arguments: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_arguments(mut self, arguments: serde_json::Value) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        if let serde_json::Value::Object(map) = &mut self.arguments {
            map.insert(key.into(), value.into());
        }
        self
    }
}
