//! Argument validation
//!
//! Pure checks of a [`ToolCallRequest`] against its [`ToolDescriptor`],
//! performed before anything is dispatched to a sandbox.

use super::call::ToolCallRequest;
use super::descriptor::ToolDescriptor;

/// Validator for tool call arguments
pub trait ArgumentValidator: Send + Sync {
    /// Validate a call against its descriptor
    fn validate(&self, call: &ToolCallRequest, descriptor: &ToolDescriptor) -> Result<(), String>;
}

/// Checks required parameters, unknown parameters and JSON types.
#[derive(Debug, Clone, Default)]
pub struct DefaultArgumentValidator;

impl ArgumentValidator for DefaultArgumentValidator {
    fn validate(&self, call: &ToolCallRequest, descriptor: &ToolDescriptor) -> Result<(), String> {
        for param in &descriptor.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, descriptor.name
                ));
            }
        }

        let mut keys: Vec<&String> = call.arguments.keys().collect();
        keys.sort();

        for arg_name in keys {
            let Some(param) = descriptor.parameter(arg_name) else {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, descriptor.name
                ));
            };
            if let Some(value) = call.arguments.get(arg_name)
                && !param.param_type.accepts(value)
            {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be of type {}",
                    arg_name,
                    descriptor.name,
                    param.param_type.as_str()
                ));
            }
        }

        Ok(())
    }
}
