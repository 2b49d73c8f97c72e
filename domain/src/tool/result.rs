//! Tool results folded back into the conversation

use super::call::ToolCallRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome class of a single tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolResultStatus {
    Ok,
    Error,
    Timeout,
    PermissionDenied,
    /// The session was cancelled while the call was pending or in flight
    Cancelled,
}

impl ToolResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolResultStatus::Ok => "ok",
            ToolResultStatus::Error => "error",
            ToolResultStatus::Timeout => "timeout",
            ToolResultStatus::PermissionDenied => "permission_denied",
            ToolResultStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ToolResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one [`ToolCallRequest`]. Produced exactly once per request.
///
/// `payload` is the tool output for `Ok` and diagnostic text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub tool_name: String,
    pub status: ToolResultStatus,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolResult {
    fn for_call(call: &ToolCallRequest, status: ToolResultStatus, payload: String) -> Self {
        Self {
            call_id: call.call_id.clone(),
            tool_name: call.tool_name.clone(),
            status,
            payload,
            duration_ms: None,
        }
    }

    pub fn ok(call: &ToolCallRequest, output: impl Into<String>) -> Self {
        Self::for_call(call, ToolResultStatus::Ok, output.into())
    }

    pub fn error(call: &ToolCallRequest, message: impl AsRef<str>) -> Self {
        Self::for_call(
            call,
            ToolResultStatus::Error,
            format!("Error: {}", message.as_ref()),
        )
    }

    pub fn unknown_tool(call: &ToolCallRequest) -> Self {
        Self::error(call, format!("No such tool available: {}", call.tool_name))
    }

    pub fn timeout(call: &ToolCallRequest, after: Duration) -> Self {
        Self::for_call(
            call,
            ToolResultStatus::Timeout,
            format!(
                "Error: Tool {} timed out after {}ms",
                call.tool_name,
                after.as_millis()
            ),
        )
    }

    pub fn permission_denied(call: &ToolCallRequest, reason: impl AsRef<str>) -> Self {
        Self::for_call(
            call,
            ToolResultStatus::PermissionDenied,
            format!("Error: {}", reason.as_ref()),
        )
    }

    pub fn cancelled(call: &ToolCallRequest) -> Self {
        Self::for_call(
            call,
            ToolResultStatus::Cancelled,
            format!("Error: Tool {} was cancelled", call.tool_name),
        )
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolResultStatus::Ok
    }
}
