//! Tool instance lifecycle.
//!
//! A [`ToolInstance`] is one remote execution context bound to a single
//! tool. Its [`InstanceState`] moves through:
//!
//! ```text
//! Created ──> Idle ──> Executing ──> Idle
//!    │         │           └──────> Failed
//!    │         └──> Released
//!    └──> Failed
//! ```
//!
//! `Released` and `Failed` are terminal. A failed instance is never reused.
//! Invalid transitions are rejected and leave the state unchanged.

use crate::util::current_timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a tool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Created,
    Executing,
    Idle,
    Released,
    Failed,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Created => "created",
            InstanceState::Executing => "executing",
            InstanceState::Idle => "idle",
            InstanceState::Released => "released",
            InstanceState::Failed => "failed",
        }
    }

    /// Released or Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Released | InstanceState::Failed)
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A remote, stateful execution context for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInstance {
    pub id: InstanceId,
    pub tool_name: String,
    state: InstanceState,
    last_activity: u64,
}

impl ToolInstance {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            id: InstanceId::new(),
            tool_name: tool_name.into(),
            state: InstanceState::Created,
            last_activity: current_timestamp(),
        }
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// Milliseconds since the Unix epoch of the last state change.
    pub fn last_activity(&self) -> u64 {
        self.last_activity
    }

    pub fn is_idle(&self) -> bool {
        self.state == InstanceState::Idle
    }

    fn transition(&mut self, allowed: bool, next: InstanceState) -> bool {
        if allowed {
            self.state = next;
            self.last_activity = current_timestamp();
        }
        allowed
    }

    /// Created → Idle once the sandbox confirmed readiness.
    pub fn mark_ready(&mut self) -> bool {
        self.transition(self.state == InstanceState::Created, InstanceState::Idle)
    }

    /// Idle → Executing.
    pub fn mark_executing(&mut self) -> bool {
        self.transition(self.state == InstanceState::Idle, InstanceState::Executing)
    }

    /// Executing → Idle after a call that left the instance usable.
    pub fn mark_idle(&mut self) -> bool {
        self.transition(
            self.state == InstanceState::Executing,
            InstanceState::Idle,
        )
    }

    /// Any non-terminal state → Failed.
    pub fn mark_failed(&mut self) -> bool {
        self.transition(!self.state.is_terminal(), InstanceState::Failed)
    }

    /// Created or Idle → Released. Executing instances must fail instead.
    pub fn mark_released(&mut self) -> bool {
        self.transition(
            matches!(self.state, InstanceState::Created | InstanceState::Idle),
            InstanceState::Released,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut inst = ToolInstance::new("bash");
        assert_eq!(inst.state(), InstanceState::Created);
        assert!(inst.mark_ready());
        assert!(inst.is_idle());
        assert!(inst.mark_executing());
        assert!(inst.mark_idle());
        assert!(inst.mark_executing());
        assert!(inst.mark_idle());
        assert!(inst.mark_released());
        assert_eq!(inst.state(), InstanceState::Released);
    }

    #[test]
    fn test_cannot_execute_unless_idle() {
        let mut inst = ToolInstance::new("bash");
        assert!(!inst.mark_executing());
        inst.mark_ready();
        inst.mark_executing();
        assert!(!inst.mark_executing());
        assert_eq!(inst.state(), InstanceState::Executing);
    }

    #[test]
    fn test_executing_cannot_be_released() {
        let mut inst = ToolInstance::new("bash");
        inst.mark_ready();
        inst.mark_executing();
        assert!(!inst.mark_released());
        assert!(inst.mark_failed());
        assert_eq!(inst.state(), InstanceState::Failed);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut failed = ToolInstance::new("grep");
        failed.mark_failed();
        assert!(!failed.mark_ready());
        assert!(!failed.mark_released());
        assert!(!failed.mark_failed());
        assert_eq!(failed.state(), InstanceState::Failed);

        let mut released = ToolInstance::new("grep");
        released.mark_ready();
        released.mark_released();
        assert!(!released.mark_released());
        assert!(!released.mark_failed());
        assert!(!released.mark_executing());
        assert_eq!(released.state(), InstanceState::Released);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ToolInstance::new("x");
        let b = ToolInstance::new("x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(InstanceState::Executing.to_string(), "executing");
        assert!(InstanceState::Failed.is_terminal());
        assert!(!InstanceState::Idle.is_terminal());
    }
}
