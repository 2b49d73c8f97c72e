//! Tool descriptors and permission classes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Static classification of a tool's blast radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionClass {
    /// Observes state only (e.g., read_file, glob_search, grep_search)
    ReadOnly,
    /// Modifies files or persistent memory (e.g., write_file, edit_file)
    Mutating,
    /// Arbitrary side effects (e.g., bash)
    Dangerous,
}

impl PermissionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionClass::ReadOnly => "read_only",
            PermissionClass::Mutating => "mutating",
            PermissionClass::Dangerous => "dangerous",
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, PermissionClass::ReadOnly)
    }
}

impl std::fmt::Display for PermissionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JSON type accepted by a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// Whether `value` is acceptable for this type.
    ///
    /// Integers are accepted where a number is expected; `null` is never accepted.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub param_type: ParamType,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: ParamType::String,
        }
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }
}

/// Static metadata for one tool in the catalog.
///
/// A descriptor is built once during catalog construction and never changes
/// after [`ToolRegistry::register`](super::registry::ToolRegistry::register).
/// The input schema is either supplied explicitly or derived from
/// `parameters` at registration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name of the tool (e.g., "read_file")
    pub name: String,
    /// One-line summary shown in schemas
    pub description: String,
    /// Long-form usage guidance, populated at catalog construction
    pub prompt_text: String,
    pub permission_class: PermissionClass,
    pub parameters: Vec<ToolParameter>,
    /// May run in parallel with other concurrency-safe calls in the same turn
    pub concurrency_safe: bool,
    /// Instances are kept Idle between calls instead of released after each one
    pub session_scoped: bool,
    /// Disabled tools are treated as absent by the registry
    pub enabled: bool,
    /// Per-call timeout overriding the session default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_schema: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        permission_class: PermissionClass,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            prompt_text: String::new(),
            permission_class,
            parameters: Vec::new(),
            concurrency_safe: false,
            session_scoped: false,
            enabled: true,
            timeout: None,
            input_schema: None,
        }
    }

    pub fn with_prompt_text(mut self, text: impl Into<String>) -> Self {
        self.prompt_text = text.into();
        self
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_concurrency_safe(mut self, safe: bool) -> Self {
        self.concurrency_safe = safe;
        self
    }

    pub fn with_session_scoped(mut self, scoped: bool) -> Self {
        self.session_scoped = scoped;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Supply an explicit input schema instead of deriving one from `parameters`.
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    /// The JSON Schema describing accepted arguments.
    pub fn input_schema(&self) -> Value {
        match &self.input_schema {
            Some(schema) => schema.clone(),
            None => self.derive_schema(),
        }
    }

    /// Fill in the derived schema if none was supplied. Called by the registry.
    pub(crate) fn freeze_schema(&mut self) {
        if self.input_schema.is_none() {
            self.input_schema = Some(self.derive_schema());
        }
    }

    /// Text sent to the model as the tool description: the summary followed by
    /// the usage guidance, when present.
    pub fn model_description(&self) -> String {
        if self.prompt_text.is_empty() {
            self.description.clone()
        } else {
            format!("{}\n\n{}", self.description, self.prompt_text)
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    fn derive_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_file() -> ToolDescriptor {
        ToolDescriptor::new("read_file", "Read a file", PermissionClass::ReadOnly)
            .with_parameter(ToolParameter::new("path", "File path", true))
            .with_parameter(
                ToolParameter::new("limit", "Max lines", false).with_type(ParamType::Integer),
            )
            .with_concurrency_safe(true)
    }

    #[test]
    fn test_permission_class_display() {
        assert_eq!(PermissionClass::ReadOnly.to_string(), "read_only");
        assert_eq!(PermissionClass::Mutating.to_string(), "mutating");
        assert_eq!(PermissionClass::Dangerous.to_string(), "dangerous");
        assert!(PermissionClass::ReadOnly.is_read_only());
        assert!(!PermissionClass::Dangerous.is_read_only());
    }

    #[test]
    fn test_derived_schema() {
        let schema = read_file().input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert_eq!(schema["properties"]["limit"]["type"], "integer");
        assert_eq!(schema["required"], json!(["path"]));
    }

    #[test]
    fn test_explicit_schema_wins() {
        let explicit = json!({"type": "object", "properties": {}});
        let tool = read_file().with_input_schema(explicit.clone());
        assert_eq!(tool.input_schema(), explicit);
    }

    #[test]
    fn test_freeze_schema_is_stable() {
        let mut tool = read_file();
        tool.freeze_schema();
        let first = tool.input_schema();
        tool.parameters.clear();
        // Frozen schema no longer depends on parameters
        assert_eq!(tool.input_schema(), first);
    }

    #[test]
    fn test_param_type_accepts() {
        assert!(ParamType::String.accepts(&json!("x")));
        assert!(!ParamType::String.accepts(&json!(1)));
        assert!(ParamType::Integer.accepts(&json!(3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::Number.accepts(&json!(3)));
        assert!(ParamType::Boolean.accepts(&json!(true)));
        assert!(ParamType::Array.accepts(&json!([1, 2])));
        assert!(ParamType::Object.accepts(&json!({})));
        assert!(!ParamType::Object.accepts(&Value::Null));
    }

    #[test]
    fn test_model_description() {
        let plain = read_file();
        assert_eq!(plain.model_description(), "Read a file");

        let guided = read_file().with_prompt_text("Use absolute paths.");
        assert_eq!(guided.model_description(), "Read a file\n\nUse absolute paths.");
    }
}
