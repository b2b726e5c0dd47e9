//! Tool domain traits
//!
//! Pure validation of an action payload against a tool's declared schema.
//! The async transport port lives in the application layer.

use super::entities::ToolSpec;
use serde_json::{Map, Value};

/// Validator for action payloads
pub trait ToolValidator {
    /// Validate a payload against the tool's declared parameters
    fn validate(&self, payload: &Map<String, Value>, spec: &ToolSpec) -> Result<(), String>;
}

/// Default implementation of ToolValidator
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, payload: &Map<String, Value>, spec: &ToolSpec) -> Result<(), String> {
        for param in &spec.parameters {
            match payload.get(&param.name) {
                None if param.required => {
                    return Err(format!(
                        "Missing required parameter '{}' for tool '{}'",
                        param.name, spec.name
                    ));
                }
                Some(value) if !matches_type(value, &param.param_type) => {
                    return Err(format!(
                        "Parameter '{}' for tool '{}' must be of type {}",
                        param.name, spec.name, param.param_type
                    ));
                }
                _ => {}
            }
        }

        for arg_name in payload.keys() {
            if spec.parameter(arg_name).is_none() {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, spec.name
                ));
            }
        }

        Ok(())
    }
}

fn matches_type(value: &Value, param_type: &str) -> bool {
    match param_type {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "object" => value.is_object(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::builtin::builtin_spec;
    use crate::tool::entities::ToolKind;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validator_missing_required() {
        let spec = builtin_spec(ToolKind::Sql);
        let result = DefaultToolValidator.validate(&payload(json!({"query": "SELECT 1"})), &spec);
        assert!(result.unwrap_err().contains("Missing required parameter 'db_name'"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let spec = builtin_spec(ToolKind::Shell);
        let result = DefaultToolValidator
            .validate(&payload(json!({"command": "ls", "cwd": "/"})), &spec);
        assert!(result.unwrap_err().contains("Unknown parameter"));
    }

    #[test]
    fn test_validator_wrong_type() {
        let spec = builtin_spec(ToolKind::Shell);
        let result = DefaultToolValidator.validate(&payload(json!({"command": 42})), &spec);
        assert!(result.unwrap_err().contains("must be of type string"));
    }

    #[test]
    fn test_validator_valid_call() {
        let spec = builtin_spec(ToolKind::Fetch);
        let result = DefaultToolValidator.validate(
            &payload(json!({"url": "https://example.com", "params": {"q": "rust"}})),
            &spec,
        );
        assert!(result.is_ok());
    }
}
