//! Tool domain traits
//!
//! Contains pure domain logic traits for argument validation.
//! Invocation itself is async and lives behind [`ToolSession`](super::provider::ToolSession).

use super::entities::ToolDescriptor;
use super::value_objects::ToolError;

/// Validator for tool arguments
///
/// Checks an argument payload against a descriptor without any I/O.
pub trait ToolValidator {
    fn validate(
        &self,
        arguments: &serde_json::Value,
        descriptor: &ToolDescriptor,
    ) -> Result<(), ToolError>;
}

/// Default implementation of ToolValidator
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(
        &self,
        arguments: &serde_json::Value,
        descriptor: &ToolDescriptor,
    ) -> Result<(), ToolError> {
        let empty = serde_json::Map::new();
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => &empty,
            other => {
                return Err(ToolError::invalid_argument(format!(
                    "Arguments for tool '{}' must be an object, got {}",
                    descriptor.name,
                    json_type_name(other)
                )));
            }
        };

        // Null on an optional parameter means unset
        let present = |name: &str| arguments.get(name).is_some_and(|v| !v.is_null());

        for param in descriptor.required_parameters() {
            if !present(&param.name) {
                return Err(ToolError::invalid_argument(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, descriptor.name
                )));
            }
        }

        for (arg_name, value) in arguments {
            let Some(param) = descriptor.parameter(arg_name) else {
                return Err(ToolError::invalid_argument(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, descriptor.name
                )));
            };

            if value.is_null() {
                continue;
            }

            if !param.accepts(value) {
                return Err(ToolError::invalid_argument(format!(
                    "Parameter '{}' of tool '{}' expects {}, got {}",
                    arg_name,
                    descriptor.name,
                    param.kind,
                    json_type_name(value)
                )));
            }
        }

        Ok(())
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "number",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::{ParameterKind, ToolParameter};
    use serde_json::json;

    fn list_dir() -> ToolDescriptor {
        ToolDescriptor::new("list_dir", "List a directory")
            .with_parameter(ToolParameter::new("path", "Directory", true))
            .with_parameter(
                ToolParameter::new("depth", "Max depth", false).with_kind(ParameterKind::Integer),
            )
            .with_parameter(
                ToolParameter::new("ratio", "Sampling ratio", false).with_kind(ParameterKind::Float),
            )
    }

    #[test]
    fn test_validator_missing_required() {
        let err = DefaultToolValidator
            .validate(&json!({"depth": 2}), &list_dir())
            .unwrap_err();
        assert_eq!(err.code, ToolError::INVALID_ARGUMENT);
        assert!(err.message.contains("Missing required parameter 'path'"));
    }

    #[test]
    fn test_validator_null_required_is_missing() {
        let err = DefaultToolValidator
            .validate(&json!({"path": null}), &list_dir())
            .unwrap_err();
        assert!(err.message.contains("Missing required parameter"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let err = DefaultToolValidator
            .validate(&json!({"path": "/tmp", "recursive": true}), &list_dir())
            .unwrap_err();
        assert!(err.message.contains("Unknown parameter 'recursive'"));
    }

    #[test]
    fn test_validator_type_mismatch() {
        let err = DefaultToolValidator
            .validate(&json!({"path": "/tmp", "depth": "two"}), &list_dir())
            .unwrap_err();
        assert!(err.message.contains("expects integer, got string"));
    }

    #[test]
    fn test_validator_accepts_optional_unset_and_null() {
        assert!(DefaultToolValidator.validate(&json!({"path": "/tmp"}), &list_dir()).is_ok());
        assert!(
            DefaultToolValidator
                .validate(&json!({"path": "/tmp", "depth": null}), &list_dir())
                .is_ok()
        );
    }

    #[test]
    fn test_validator_skips_type_check_for_undeclared_kind() {
        let search = ToolDescriptor::new("search", "Search")
            .with_parameter(ToolParameter::new("query", "Query", true))
            .with_parameter(ToolParameter::new("limit", "Result cap", false).undeclared());

        assert!(
            DefaultToolValidator
                .validate(&json!({"query": "rust", "limit": 5}), &search)
                .is_ok()
        );
        assert!(
            DefaultToolValidator
                .validate(&json!({"query": "rust", "limit": "5"}), &search)
                .is_ok()
        );
    }

    #[test]
    fn test_validator_accepts_integer_for_float() {
        assert!(
            DefaultToolValidator
                .validate(&json!({"path": "/tmp", "ratio": 1}), &list_dir())
                .is_ok()
        );
    }

    #[test]
    fn test_validator_rejects_non_object_payload() {
        let err = DefaultToolValidator.validate(&json!(["/tmp"]), &list_dir()).unwrap_err();
        assert!(err.message.contains("must be an object, got array"));
    }

    #[test]
    fn test_validator_null_payload_for_tool_without_required() {
        let ping = ToolDescriptor::new("ping", "Ping");
        assert!(DefaultToolValidator.validate(&serde_json::Value::Null, &ping).is_ok());
    }
}
