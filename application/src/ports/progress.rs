//! Progress notification port
//!
//! Defines the interface for reporting progress while a session runs.
//! Every method has a no-op default so adapters implement only what they show.

use toolpod_domain::{TerminationReason, ToolCallRequest, ToolResult};

/// Callback for progress updates during a session
pub trait SessionProgressNotifier: Send + Sync {
    /// Called before each model round trip (zero-based turn index).
    fn on_turn_start(&self, _turn: usize) {}

    /// Called when the model requests tool calls.
    fn on_tool_calls(&self, _turn: usize, _calls: &[ToolCallRequest]) {}

    /// Called when a call is about to be dispatched to a sandbox.
    fn on_tool_call(&self, _call: &ToolCallRequest) {}

    /// Called as each result is produced, in completion order.
    fn on_tool_result(&self, _result: &ToolResult) {}

    /// Called once when the session ends.
    fn on_terminated(&self, _reason: &TerminationReason) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoSessionProgress;

impl SessionProgressNotifier for NoSessionProgress {}
