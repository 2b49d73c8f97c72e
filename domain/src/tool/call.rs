//! Tool call requests issued by the model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Untyped key→value arguments of a tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArguments(HashMap<String, Value>);

impl ToolArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string argument, or a message naming the missing key.
    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required string argument '{}'", key))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(|v| v.as_bool())
    }

    /// Parse from a JSON object; any other JSON value yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map.into_iter().collect())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for ToolArguments {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One tool invocation requested by the model within a turn.
///
/// Consumed exactly once by dispatch; `call_id` is unique within the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: ToolArguments,
    /// Zero-based turn this request belongs to
    pub turn_index: usize,
}

impl ToolCallRequest {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments: ToolArguments::new(),
            turn_index: 0,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments = self.arguments.with(key, value);
        self
    }

    pub fn with_arguments(mut self, arguments: ToolArguments) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_turn(mut self, turn_index: usize) -> Self {
        self.turn_index = turn_index;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argument_accessors() {
        let args = ToolArguments::new()
            .with("path", "/tmp/a")
            .with("limit", 10)
            .with("recursive", true);

        assert_eq!(args.get_string("path"), Some("/tmp/a"));
        assert_eq!(args.get_i64("limit"), Some(10));
        assert_eq!(args.get_bool("recursive"), Some(true));
        assert_eq!(args.get_string("limit"), None);
        assert!(args.require_string("missing").unwrap_err().contains("missing"));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(ToolArguments::from_value(json!([1, 2])).is_none());
        let args = ToolArguments::from_value(json!({"a": 1})).unwrap();
        assert_eq!(args.get_i64("a"), Some(1));
        assert_eq!(args.to_value(), json!({"a": 1}));
    }

    #[test]
    fn test_request_builder() {
        let call = ToolCallRequest::new("call_0", "read_file")
            .with_arg("path", "README.md")
            .with_turn(2);
        assert_eq!(call.call_id, "call_0");
        assert_eq!(call.turn_index, 2);
        assert_eq!(call.arguments.get_string("path"), Some("README.md"));
    }

    #[test]
    fn test_arguments_serialize_as_plain_object() {
        let args = ToolArguments::new().with("k", "v");
        assert_eq!(serde_json::to_value(&args).unwrap(), json!({"k": "v"}));
    }
}
